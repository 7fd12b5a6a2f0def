//! Property tests for name resolution, coercion and filtering.

use dyncrud_core::{
    coerce_str, fields, loosely_equals, Engine, FieldType, TypeRegistry, Value, BUILTIN,
};
use proptest::prelude::*;
use serde_json::json;

fn recase(name: &str, mask: &[bool]) -> String {
    name.chars()
        .zip(mask.iter().cycle())
        .map(|(c, upper)| if *upper { c.to_ascii_uppercase() } else { c })
        .collect()
}

proptest! {
    #[test]
    fn builtin_names_resolve_in_any_case(
        index in 0..BUILTIN.len(),
        mask in prop::collection::vec(any::<bool>(), 1..12),
    ) {
        let registry = TypeRegistry::builtin();
        let name = BUILTIN[index].name;
        let mixed = recase(name, &mask);
        let resolved = registry.resolve(&mixed).unwrap();
        prop_assert_eq!(resolved.name(), name);
    }

    #[test]
    fn integer_text_coerces_back_to_itself(n in any::<i64>()) {
        prop_assert_eq!(coerce_str(&n.to_string(), FieldType::Integer), Some(Value::Integer(n)));
        prop_assert_eq!(
            coerce_str(&format!("  {n} "), FieldType::Integer),
            Some(Value::Integer(n))
        );
    }

    #[test]
    fn text_is_never_trimmed(s in "\\PC{0,16}") {
        prop_assert_eq!(coerce_str(&s, FieldType::Text), Some(Value::Text(s.clone())));
    }

    #[test]
    fn numbers_and_their_text_are_loosely_equal(n in any::<i32>()) {
        prop_assert!(loosely_equals(&json!(n), &json!(n.to_string())));
        let suffixed = format!("{n}x");
        prop_assert!(!loosely_equals(&json!(n), &json!(suffixed)));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn integer_filters_select_exactly_the_matching_rows(
        quantities in prop::collection::vec(1i64..5, 1..8),
        wanted in 1i64..5,
    ) {
        let engine = Engine::in_memory();
        let customer = engine
            .create("customer", fields! {
                "FirstName" => "A", "LastName" => "B", "Email" => "e",
                "Phone" => "p", "Address" => "a",
            })
            .unwrap();
        let order = engine
            .create("order", fields! {
                "CustomerId" => (customer.id()),
                "OrderDate" => "2024-01-01",
                "TotalAmount" => 0,
                "Status" => "Open",
            })
            .unwrap();
        let product = engine
            .create("product", fields! {
                "ProductName" => "P", "ProductDescription" => "D", "Price" => 1,
            })
            .unwrap();

        for quantity in &quantities {
            engine
                .create("orderproduct", fields! {
                    "OrderId" => (order.id()),
                    "ProductId" => (product.id()),
                    "Quantity" => quantity,
                    "Price" => 1,
                })
                .unwrap();
        }

        let filter = [("Quantity", format!(" {wanted}"))];
        let matched = engine.list("OrderProduct", filter).unwrap();
        let expected = quantities.iter().filter(|q| **q == wanted).count();
        prop_assert_eq!(matched.len(), expected);
    }
}
