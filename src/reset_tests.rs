#[cfg(test)]
mod tests {
    use crate::dom::Node;
    use crate::{BindValue, Binder, BindingSpec, Scope};
    use serde_json::{json, Value};

    fn status_binder() -> Binder {
        Binder::new(
            r#"<li class="item" style="color: black;"><span class="badge"></span></li>"#,
            BindingSpec::new()
                .text("@class.add", "status")
                .function("@class.remove", |data: &Value, _: &Scope| {
                    BindValue::from(if data["highlight"].as_bool().unwrap_or(false) {
                        ""
                    } else {
                        "item"
                    })
                })
                .text("@style.fontWeight", "weight")
                .text("span.badge", "badge"),
        )
        .unwrap()
    }

    #[test]
    fn test_reset_is_idempotent_across_cuts() {
        let binder = status_binder();
        let data = json!({"status": "open", "highlight": true, "weight": "bold", "badge": "1"});
        let first = binder.bind(data.clone());
        binder.bind(json!({"status": "closed", "highlight": false, "badge": "2"}));
        let third = binder.bind(data);
        assert_eq!(first.outer_html(), third.outer_html());
        assert_eq!(
            first.outer_html(),
            r#"<li class="item open" style="color: black; font-weight: bold;"><span class="badge">1</span></li>"#
        );
    }

    #[test]
    fn test_removed_tokens_come_back() {
        let binder = status_binder();
        let removed = binder.bind(json!({"status": "open", "highlight": false}));
        assert_eq!(removed.attribute("class").as_deref(), Some("open"));
        let kept = binder.bind(json!({"status": "open", "highlight": true}));
        assert_eq!(kept.attribute("class").as_deref(), Some("item open"));
    }

    #[test]
    fn test_reset_root_is_never_bound() {
        let binder = status_binder();
        let pristine = binder.reset_root().outer_html();
        let node = binder.bind(json!({"status": "open", "weight": "bold", "badge": "x"}));
        binder.rebind(json!({"status": "done", "badge": "y"}), &node);
        assert_eq!(binder.reset_root().outer_html(), pristine);
        assert!(binder.reset_root().bound_data().is_none());
    }

    #[test]
    fn test_rebind_resets_the_instance_not_the_template() {
        let binder = status_binder();
        let node = binder.bind(json!({"status": "open", "highlight": true, "weight": "bold"}));
        let template_before = binder.template().outer_html();

        binder.rebind(json!({"status": "done", "highlight": true}), &node);
        assert_eq!(node.attribute("class").as_deref(), Some("item done"));
        assert_eq!(node.attribute("style").as_deref(), Some("color: black;"));
        assert_eq!(binder.template().outer_html(), template_before);
    }

    #[test]
    fn test_exempt_reset_is_skipped_on_rebind() {
        let binder = Binder::new(
            r#"<div><p class="base"></p></div>"#,
            BindingSpec::new().text("!p@class.add", "kind"),
        )
        .unwrap();
        let node = binder.bind(json!({"kind": "first"}));
        binder.rebind(json!({"kind": "second"}), &node);
        assert_eq!(node.inner_html(), r#"<p class="base first"></p>"#);
    }

    #[test]
    fn test_shared_reset_runs_when_any_leaf_rebinds() {
        let binder = Binder::new(
            r#"<div><p class="base"></p></div>"#,
            BindingSpec::new()
                .text("!p@class.add", "fixed")
                .text("p@class.add", "kind"),
        )
        .unwrap();
        let node = binder.bind(json!({"fixed": "f", "kind": "a"}));
        binder.rebind(json!({"fixed": "g", "kind": "b"}), &node);
        assert_eq!(node.inner_html(), r#"<p class="base b"></p>"#);
    }

    #[test]
    fn test_every_matched_node_is_restored_from_its_own_original() {
        let element = Node::parse(r#"<ul><li class="a"></li><li class="b"></li></ul>"#).unwrap();
        let binder = Binder::in_place(&element, BindingSpec::new().text("li@class.add", "extra")).unwrap();

        binder.bind(json!({"extra": "x"}));
        assert_eq!(element.inner_html(), r#"<li class="a x"></li><li class="b x"></li>"#);
        binder.bind(json!({"extra": "y"}));
        assert_eq!(element.inner_html(), r#"<li class="a y"></li><li class="b y"></li>"#);
    }
}
