//! Links sub-object fields to their parent's key.

use crate::config::LinkStrategy;
use crate::fields::FieldMap;
use crate::schema::{EntityDescriptor, ParentKey, Record};
use tracing::debug;

/// Writes a parent's key into a child's field map.
///
/// With [`LinkStrategy::DeclaredThenHeuristic`], a child type that declares a
/// foreign key to the parent's type gets that field set. Otherwise the
/// naming convention in [`link_by_convention`] decides.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkResolver {
    strategy: LinkStrategy,
}

impl LinkResolver {
    /// Creates a resolver with the given strategy.
    #[must_use]
    pub const fn new(strategy: LinkStrategy) -> Self {
        Self { strategy }
    }

    /// Links `fields` to `parent`.
    ///
    /// A parent without an id yet is not linkable; the fields come back
    /// unchanged.
    #[must_use]
    pub fn link_child(
        &self,
        parent: &Record,
        child: Option<&EntityDescriptor>,
        fields: FieldMap,
    ) -> FieldMap {
        match parent.parent_key() {
            Some(key) => self.link_to_key(&key, child, fields),
            None => fields,
        }
    }

    /// Links `fields` to an explicit parent key.
    #[must_use]
    pub fn link_to_key(
        &self,
        parent: &ParentKey,
        child: Option<&EntityDescriptor>,
        mut fields: FieldMap,
    ) -> FieldMap {
        if let Some(fk) = child.and_then(|c| c.foreign_key_to(parent.type_name)) {
            // Overwrite a differently-cased spelling in place.
            let target = fields
                .get_ignore_case(fk.field)
                .map_or_else(|| fk.field.to_string(), |(key, _)| key.to_string());
            fields.insert(target, parent.value);
            return fields;
        }

        match self.strategy {
            LinkStrategy::DeclaredThenHeuristic => link_by_convention(parent, fields),
            LinkStrategy::DeclaredOnly => {
                debug!(
                    parent = parent.type_name,
                    "child declares no foreign key to parent; leaving fields unlinked"
                );
                fields
            }
        }
    }
}

/// Links by field naming convention.
///
/// In order of preference, the target is:
/// 1. the first field named like the parent's key, ignoring ASCII case;
/// 2. the first field whose name contains the parent's type name, ignoring
///    ASCII case;
/// 3. a new field named after the parent's key.
///
/// Existing fields are overwritten in place.
#[must_use]
pub fn link_by_convention(parent: &ParentKey, mut fields: FieldMap) -> FieldMap {
    let type_name = parent.type_name.to_lowercase();
    let target = fields
        .keys()
        .find(|key| key.eq_ignore_ascii_case(parent.field))
        .or_else(|| fields.keys().find(|key| key.to_lowercase().contains(&type_name)))
        .unwrap_or(parent.field)
        .to_string();
    fields.insert(target, parent.value);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields;
    use crate::schema::{Order, OrderProduct};
    use serde_json::json;

    fn order_key(value: i64) -> ParentKey {
        ParentKey {
            type_name: "order",
            display_name: "Order",
            field: "OrderId",
            value,
        }
    }

    #[test]
    fn declared_foreign_key_wins() {
        let resolver = LinkResolver::default();
        let linked = resolver.link_to_key(
            &order_key(7),
            Some(OrderProduct::descriptor()),
            fields! { "OrderNote" => "x", "ProductId" => 1 },
        );
        assert_eq!(linked.get("OrderId"), Some(&json!(7)));
        assert_eq!(linked.get("OrderNote"), Some(&json!("x")));
    }

    #[test]
    fn declared_foreign_key_overwrites_other_casing() {
        let resolver = LinkResolver::default();
        let linked = resolver.link_to_key(
            &order_key(7),
            Some(OrderProduct::descriptor()),
            fields! { "orderid" => 1 },
        );
        assert_eq!(linked.len(), 1);
        assert_eq!(linked.get("orderid"), Some(&json!(7)));
    }

    #[test]
    fn convention_prefers_exact_key_name() {
        let linked = link_by_convention(
            &order_key(3),
            fields! { "OrderNote" => "x", "orderID" => 0 },
        );
        assert_eq!(linked.get("orderID"), Some(&json!(3)));
        assert_eq!(linked.get("OrderNote"), Some(&json!("x")));
    }

    #[test]
    fn convention_falls_back_to_containment() {
        let linked = link_by_convention(&order_key(3), fields! { "ParentOrderRef" => 0 });
        assert_eq!(linked.get("ParentOrderRef"), Some(&json!(3)));
        assert_eq!(linked.len(), 1);
    }

    #[test]
    fn convention_appends_key_field() {
        let linked = link_by_convention(&order_key(3), fields! { "Quantity" => 2 });
        let keys: Vec<&str> = linked.keys().collect();
        assert_eq!(keys, vec!["Quantity", "OrderId"]);
    }

    #[test]
    fn declared_only_leaves_undeclared_children() {
        let resolver = LinkResolver::new(LinkStrategy::DeclaredOnly);
        let input = fields! { "Quantity" => 2 };
        let linked = resolver.link_to_key(&order_key(3), None, input.clone());
        assert_eq!(linked, input);
    }

    #[test]
    fn unsaved_parent_is_not_linkable() {
        let parent = Record::Order(Order::default());
        let input = fields! { "Quantity" => 2 };
        let linked = LinkResolver::default().link_child(&parent, None, input.clone());
        assert_eq!(linked, input);
    }
}
