#[cfg(test)]
mod tests {
    use crate::dom::Node;
    use crate::{BindMode, BindOptions, BindValue, Binder, BindingSpec, EventContext, Scope};
    use serde_json::{json, Value};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn select(root: &Node, selector: &str) -> Node {
        root.query_selector(selector).unwrap().unwrap()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TEMPLATED STRINGS
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_templated_string_composition() {
        let binder = Binder::new(
            r#"<div><span class="name"></span></div>"#,
            BindingSpec::new().text("span.name", "{title} {givenName} {familyName}"),
        )
        .unwrap();
        let node = binder.bind(json!({"title": "Mr.", "givenName": "A", "familyName": "B"}));
        assert_eq!(select(&node, "span.name").text_content(), "Mr. A B");
    }

    #[test]
    fn test_missing_property_degrades_to_empty() {
        let binder = Binder::new(
            r#"<div><span class="name">placeholder</span></div>"#,
            BindingSpec::new().text("span.name", "{givenName}"),
        )
        .unwrap();
        let node = binder.bind(json!({}));
        assert_eq!(select(&node, "span.name").text_content(), "");
    }

    #[test]
    fn test_failing_expression_only_affects_its_binding() {
        let binder = Binder::builder(
            r#"<div><span class="a">old</span><span class="b"></span></div>"#,
            BindingSpec::new()
                .text("span.a", "$data.a.b")
                .text("span.b", "name"),
        )
        .options(BindOptions::new().with_bind_warnings(true))
        .build()
        .unwrap();
        let node = binder.bind(json!({"name": "n"}));
        assert_eq!(node.outer_html(), r#"<div><span class="a"></span><span class="b">n</span></div>"#);
        assert!(binder.options().bind_warnings);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // COOKIE-CUTTER CYCLES
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_repeated_binds_reset_the_template() {
        let binder = Binder::new(
            r#"<div class="row"><span class="name"></span></div>"#,
            BindingSpec::new()
                .text("@class.add", "kind")
                .text("span.name", "name"),
        )
        .unwrap();
        let first = binder.bind(json!({"kind": "a", "name": "x"}));
        let second = binder.bind(json!({"kind": "b", "name": "y"}));

        assert_eq!(first.outer_html(), r#"<div class="row a"><span class="name">x</span></div>"#);
        assert_eq!(second.outer_html(), r#"<div class="row b"><span class="name">y</span></div>"#);
        assert!(!first.ptr_eq(&second));
        assert_eq!(binder.template().attribute("class").as_deref(), Some("row b"));
        assert_eq!(
            binder.reset_root().outer_html(),
            r#"<div class="row"><span class="name"></span></div>"#
        );
    }

    #[test]
    fn test_rebind_matches_fresh_bind() {
        let clicks = Rc::new(RefCell::new(0));
        let counter = clicks.clone();
        let binder = Binder::new(
            r#"<div class="row"><span class="name"></span><a>link</a></div>"#,
            BindingSpec::new()
                .text("span.name", "name")
                .text("@class.add", "kind")
                .text("a@href", "/contacts/{id}")
                .text("span.name@style.color", "color")
                .text("@dataset.id", "id")
                .handler("a@event.click", move |_: &EventContext<'_>| *counter.borrow_mut() += 1),
        )
        .unwrap();

        let d1 = json!({"id": 1, "name": "Ada", "kind": "admin", "color": "red"});
        let d2 = json!({"id": 2, "name": "Bob", "kind": "guest", "color": "blue"});
        let node = binder.bind(d1);
        let rebound = binder.rebind(d2.clone(), &node);
        let fresh = binder.bind(d2);

        assert!(rebound.ptr_eq(&node));
        assert_eq!(node.outer_html(), fresh.outer_html());
        assert_eq!(
            node.outer_html(),
            r#"<div class="row guest" data-id="2"><span class="name" style="color: blue;">Bob</span><a href="/contacts/2">link</a></div>"#
        );

        let link = select(&node, "a");
        assert_eq!(link.listener_count("click"), 1);
        link.dispatch_event("click");
        assert_eq!(*clicks.borrow(), 1);
    }

    #[test]
    fn test_rebind_exempt_leaf_is_left_alone() {
        let binder = Binder::new(
            r#"<div><span class="id"></span><span class="name"></span></div>"#,
            BindingSpec::new()
                .text("!span.id", "id")
                .text("span.name", "name"),
        )
        .unwrap();
        let node = binder.bind(json!({"id": 1, "name": "first"}));
        binder.rebind(json!({"id": 2, "name": "second"}), &node);
        assert_eq!(select(&node, "span.id").text_content(), "1");
        assert_eq!(select(&node, "span.name").text_content(), "second");
    }

    #[test]
    fn test_nested_exempt_child_is_left_alone() {
        let binder = Binder::new(
            r#"<div><p><b></b><i></i></p></div>"#,
            BindingSpec::new().nest("p", BindingSpec::new().text("!b", "b").text("i", "i")),
        )
        .unwrap();
        let node = binder.bind(json!({"b": "1", "i": "1"}));
        binder.rebind(json!({"b": "2", "i": "2"}), &node);
        assert_eq!(node.outer_html(), "<div><p><b>1</b><i>2</i></p></div>");
    }

    #[test]
    fn test_property_binding_applies_after_clone() {
        let binder = Binder::new(
            r#"<div><input class="v"></div>"#,
            BindingSpec::new().text("input.v@pty.value", "value"),
        )
        .unwrap();
        let node = binder.bind(json!({"value": "typed"}));
        let input = select(&node, "input.v");
        assert_eq!(input.property("value"), Some(json!("typed")));
        assert!(select(binder.template(), "input.v").property("value").is_none());
        assert!(select(&node.deep_clone(), "input.v").property("value").is_none());

        binder.rebind(json!({"value": "changed"}), &node);
        assert_eq!(input.property("value"), Some(json!("changed")));
    }

    #[test]
    fn test_bound_data_is_the_same_reference() {
        let binder = Binder::new("<p></p>", BindingSpec::new().text("", "text")).unwrap();
        let data = Rc::new(json!({"text": "hello"}));
        let node = binder.bind(data.clone());
        assert_eq!(node.text_content(), "hello");
        assert!(Rc::ptr_eq(&binder.bound_data(Some(&node)).unwrap(), &data));
        assert!(binder.bound_data(None).is_none());
    }

    #[test]
    fn test_refresh_reuses_stored_data() {
        let scope = Scope::new().with_property("suffix", json!("!"));
        let binder = Binder::builder("<p></p>", BindingSpec::new().text("", "{text}{this.suffix}"))
            .scope(scope.clone())
            .build()
            .unwrap();
        let node = binder.bind(json!({"text": "hi"}));
        scope.set_property("suffix", json!("?"));
        binder.refresh(&node);
        assert_eq!(node.text_content(), "hi?");
    }

    #[test]
    fn test_bind_stored_reuses_the_last_data() {
        let binder = Binder::new("<p></p>", BindingSpec::new().text("", "text")).unwrap();
        assert_eq!(binder.bind_stored().text_content(), "");
        let first = binder.bind(json!({"text": "hello"}));
        let again = binder.bind_stored();
        assert!(!again.ptr_eq(&first));
        assert_eq!(again.text_content(), "hello");
        assert_eq!(binder.bound_data(Some(&again)).as_deref(), Some(&json!({"text": "hello"})));
    }

    fn link_binder() -> Binder {
        Binder::new(
            r#"<div><a class="l" title="Open">x</a></div>"#,
            BindingSpec::new()
                .text("a.l@href", "url")
                .text("a.l@title", "title")
                .text("@dataset.id", "id")
                .text("a.l@pty.target", "target"),
        )
        .unwrap()
    }

    #[test]
    fn test_missing_values_do_not_leak_into_later_clones() {
        let binder = link_binder();
        let first = binder.bind(json!({"url": "/people/alice", "title": "Alice", "id": 1, "target": "_blank"}));
        let second = binder.bind(json!({}));

        assert_eq!(second.outer_html(), r#"<div><a class="l" title="Open">x</a></div>"#);
        assert!(select(&second, "a.l").property("target").is_none());
        assert_eq!(
            first.outer_html(),
            r#"<div data-id="1"><a class="l" title="Alice" href="/people/alice">x</a></div>"#
        );
        assert_eq!(select(&first, "a.l").property("target"), Some(json!("_blank")));
    }

    #[test]
    fn test_rebind_with_missing_values_matches_fresh_bind() {
        let binder = link_binder();
        let node = binder.bind(json!({"url": "/people/alice", "title": "Alice", "id": 1, "target": "_blank"}));
        binder.rebind(json!({}), &node);
        let fresh = binder.bind(json!({}));

        assert_eq!(node.outer_html(), fresh.outer_html());
        assert_eq!(select(&node, "a.l").attribute("title").as_deref(), Some("Open"));
        assert!(node.attribute("data-id").is_none());
        assert!(select(&node, "a.l").property("target").is_none());
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // AFTER-BIND CALLBACK AND EVENTS
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_after_bind_fires_once_per_cycle_after_bindings() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let binder = Binder::new(
            r#"<div><span></span></div>"#,
            BindingSpec::new()
                .text("span", "name")
                .handler("@event.bound", move |ctx: &EventContext<'_>| {
                    assert_eq!(ctx.event.name(), "bound");
                    sink.borrow_mut().push((ctx.bound_node.text_content(), ctx.data["name"].clone()));
                }),
        )
        .unwrap();

        let node = binder.bind(json!({"name": "x"}));
        binder.rebind(json!({"name": "y"}), &node);
        assert_eq!(
            *seen.borrow(),
            vec![("x".to_string(), json!("x")), ("y".to_string(), json!("y"))]
        );
    }

    #[test]
    fn test_two_bound_events_fail_construction() {
        let result = Binder::new(
            "<div><span></span></div>",
            BindingSpec::new()
                .handler("@event.bound", |_: &EventContext<'_>| {})
                .handler("span@event.bound", |_: &EventContext<'_>| {}),
        );
        assert_eq!(result.unwrap_err().code(), "BND-024");
    }

    #[test]
    fn test_event_listener_sees_rebound_data() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let scope = Scope::new().with_handler("select", move |ctx: &EventContext<'_>| {
            sink.borrow_mut().push(ctx.data["id"].clone());
            assert_eq!(ctx.target_node.tag_name(), Some("button"));
        });
        let binder = Binder::builder(
            "<div><button>pick</button></div>",
            BindingSpec::new().text("button@event.click", ".select()"),
        )
        .scope(scope)
        .build()
        .unwrap();

        let node = binder.bind(json!({"id": 1}));
        let button = select(&node, "button");
        button.dispatch_event("click");
        binder.rebind(json!({"id": 2}), &node);
        button.dispatch_event("click");

        assert_eq!(*seen.borrow(), vec![json!(1), json!(2)]);
        assert_eq!(button.listener_count("click"), 1);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // BINDING KINDS
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_append_replaces_children() {
        let binder = Binder::new(
            "<div><ul></ul></div>",
            BindingSpec::new().function("ul#append", |data: &Value, _: &Scope| {
                let items = data["items"].as_array().cloned().unwrap_or_default();
                let nodes: Vec<Node> = items
                    .iter()
                    .map(|item| {
                        let li = Node::element("li");
                        li.set_text_content(item.as_str().unwrap_or(""));
                        li
                    })
                    .collect();
                BindValue::from(nodes)
            }),
        )
        .unwrap();

        let first = binder.bind(json!({"items": ["a", "b"]}));
        let second = binder.bind(json!({"items": ["c"]}));
        assert_eq!(first.outer_html(), "<div><ul><li>a</li><li>b</li></ul></div>");
        assert_eq!(second.outer_html(), "<div><ul><li>c</li></ul></div>");
    }

    #[test]
    fn test_inner_html_binding() {
        let binder = Binder::new(
            r#"<div><p class="c"></p></div>"#,
            BindingSpec::new().text("p.c#innerHTML", "html"),
        )
        .unwrap();
        let node = binder.bind(json!({"html": "<b>bold</b> text"}));
        assert_eq!(select(&node, "p.c").inner_html(), "<b>bold</b> text");
    }

    #[test]
    fn test_attribute_remove_and_restore() {
        let binder = Binder::new(
            r#"<div><button disabled="disabled">go</button></div>"#,
            BindingSpec::new().function("button@disabled.remove", |data: &Value, _: &Scope| {
                BindValue::from(data["enabled"].as_bool().unwrap_or(false))
            }),
        )
        .unwrap();

        let node = binder.bind(json!({"enabled": true}));
        assert_eq!(node.outer_html(), "<div><button>go</button></div>");
        binder.rebind(json!({"enabled": false}), &node);
        assert_eq!(node.outer_html(), r#"<div><button disabled="disabled">go</button></div>"#);
        let again = binder.bind(json!({"enabled": false}));
        assert_eq!(again.outer_html(), r#"<div><button disabled="disabled">go</button></div>"#);
    }

    #[test]
    fn test_style_null_removes_property() {
        let binder = Binder::new(
            "<div><span></span></div>",
            BindingSpec::new().text("span@style.backgroundColor", "color"),
        )
        .unwrap();
        let red = binder.bind(json!({"color": "red"}));
        assert_eq!(red.inner_html(), r#"<span style="background-color: red;"></span>"#);
        let plain = binder.bind(json!({"color": null}));
        assert_eq!(plain.inner_html(), "<span></span>");
    }

    #[test]
    fn test_dataset_and_attribute_bindings() {
        let binder = Binder::new(
            r#"<div><a class="link"></a></div>"#,
            BindingSpec::new()
                .text("@dataset.contactId", "id")
                .text("a.link@href", "/contacts/{id}")
                .text("a.link@title", "missing"),
        )
        .unwrap();
        let node = binder.bind(json!({"id": 7}));
        assert_eq!(
            node.outer_html(),
            r#"<div data-contact-id="7"><a class="link" href="/contacts/7"></a></div>"#
        );
    }

    #[test]
    fn test_direct_child_and_grouped_selectors() {
        let binder = Binder::new(
            "<div><span></span><p><span></span></p><h1></h1><h2></h2></div>",
            BindingSpec::new()
                .text(">span", "a")
                .text("(h1, h2)@title", "b"),
        )
        .unwrap();
        let node = binder.bind(json!({"a": "x", "b": "y"}));
        assert_eq!(
            node.outer_html(),
            r#"<div><span>x</span><p><span></span></p><h1 title="y"></h1><h2 title="y"></h2></div>"#
        );
    }

    #[test]
    fn test_scope_shortcuts_and_expressions() {
        let scope = Scope::new()
            .with_property("currency", json!("$"))
            .with_method("double", |data: &Value, _: &Scope| {
                BindValue::from(data["amount"].as_f64().unwrap_or(0.0) * 2.0)
            });
        let binder = Binder::builder(
            r#"<div><i class="a"></i><i class="b"></i><i class="c"></i><i class="d"></i></div>"#,
            BindingSpec::new()
                .text("i.a", ".double()")
                .text("i.b", ".currency")
                .text("i.c", "{this.currency}{amount}")
                .text("i.d", "$this.currency + data.amount.toFixed(2)"),
        )
        .scope(scope)
        .build()
        .unwrap();
        let node = binder.bind(json!({"amount": 5}));
        let texts: Vec<String> = node.element_children().iter().map(Node::text_content).collect();
        assert_eq!(texts, vec!["10", "$", "$5", "$5.00"]);
    }

    #[test]
    fn test_default_scope_is_derived_from_the_spec() {
        let binder = Binder::new(
            "<div><h1></h1><h2></h2><h3></h3></div>",
            BindingSpec::new()
                .function("h2", |data: &Value, _: &Scope| BindValue::from(data["n"].clone()))
                .text("h1", ".h2()")
                .text("h3", "{this.h1}"),
        )
        .unwrap();
        let node = binder.bind(json!({"n": "x"}));
        assert_eq!(node.outer_html(), "<div><h1>x</h1><h2>x</h2><h3>.h2()</h3></div>");
    }

    #[test]
    fn test_out_of_range_method_argument_blanks_the_value() {
        let binder = Binder::new("<p></p>", BindingSpec::new().text("", "$data.n.toFixed(data.d)")).unwrap();
        assert_eq!(binder.bind(json!({"n": 1.5, "d": 100000})).text_content(), "");
        assert_eq!(binder.bind(json!({"n": 1.5, "d": -2})).text_content(), "");
        assert_eq!(binder.bind(json!({"n": 1.26, "d": 1})).text_content(), "1.3");
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // IN-PLACE MODE
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_in_place_binds_the_template_itself() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let element = Node::parse(r#"<div><span class="n"></span><button>go</button></div>"#).unwrap();
        let binder = Binder::in_place(
            &element,
            BindingSpec::new()
                .text("!span.n", "name")
                .handler("button@event.click", move |ctx: &EventContext<'_>| {
                    sink.borrow_mut().push(ctx.data["name"].clone())
                }),
        )
        .unwrap();
        assert!(binder.is_in_place());
        assert_eq!(binder.mode(), BindMode::InPlace);

        let button = select(&element, "button");
        assert_eq!(button.listener_count("click"), 1);

        let out = binder.bind(json!({"name": "a"}));
        assert!(out.ptr_eq(&element));
        button.dispatch_event("click");

        // `!` is ignored for in-place binders
        binder.rebind(json!({"name": "b"}), &element);
        assert_eq!(select(&element, "span.n").text_content(), "b");
        button.dispatch_event("click");

        binder.refresh(&element);
        assert_eq!(select(&element, "span.n").text_content(), "b");
        assert!(binder.bind_stored().ptr_eq(&element));
        assert_eq!(select(&element, "span.n").text_content(), "b");
        assert_eq!(binder.bound_data(None).as_deref(), Some(&json!({"name": "b"})));
        assert_eq!(*seen.borrow(), vec![json!("a"), json!("b")]);
        assert_eq!(button.listener_count("click"), 1);
    }

    #[test]
    fn test_in_place_class_round_trip_uses_reset_root() {
        let element = Node::parse(r#"<div class="a  b"></div>"#).unwrap();
        let binder = Binder::in_place(&element, BindingSpec::new().text("@class.add", "extra")).unwrap();

        binder.bind(json!({"extra": "x"}));
        assert_eq!(element.attribute("class").as_deref(), Some("a b x"));
        binder.bind(json!({"extra": ""}));
        assert_eq!(element.attribute("class").as_deref(), Some("a  b"));
        assert_eq!(binder.reset_root().attribute("class").as_deref(), Some("a  b"));
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TEMPLATES
    // ═══════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_template_element_content_is_used() {
        let template = Node::parse(r#"<template><div class="card"><span></span></div></template>"#).unwrap();
        let binder = Binder::new(&template, BindingSpec::new().text("span", "v")).unwrap();
        let node = binder.bind(json!({"v": "ok"}));
        assert_eq!(node.outer_html(), r#"<div class="card"><span>ok</span></div>"#);
    }

    #[test]
    fn test_element_template_is_not_mutated() {
        let source = Node::parse("<div><span></span></div>").unwrap();
        let binder = Binder::new(&source, BindingSpec::new().text("span", "v")).unwrap();
        binder.bind(json!({"v": "x"}));
        assert_eq!(source.outer_html(), "<div><span></span></div>");
    }

    #[test]
    fn test_invalid_templates() {
        let spec = || BindingSpec::new();
        assert_eq!(Binder::new("just text", spec()).unwrap_err().code(), "BND-001");
        assert_eq!(Binder::new(Node::text("x"), spec()).unwrap_err().code(), "BND-001");
        assert_eq!(
            Binder::builder("<div></div>", spec()).in_place().build().unwrap_err().code(),
            "BND-001"
        );
        assert_eq!(Binder::new(Node::parse("<template></template>").unwrap(), spec()).unwrap_err().code(), "BND-001");
    }
}
