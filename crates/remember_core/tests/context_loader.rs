use remember_core::{ContextLoader, ResourceKind, ResourceService, ResourceStore};

#[test]
fn extra_context_snippet_only() {
    let store = ResourceStore::open_in_memory().unwrap();
    let service = ResourceService::new(&store);
    service
        .set_snippet("coding", "hello", "print(1)", Some("text/plain"))
        .unwrap();

    let view = ContextLoader::new(&store).load(&["coding"]).unwrap();

    assert_eq!(view.contexts, vec!["me", "coding"]);
    assert!(view.rules.is_empty());
    assert!(view.summaries.is_empty());
    assert_eq!(view.snippets.len(), 1);
    assert_eq!(view.snippets[0].key, "hello");
    assert_eq!(view.snippets[0].content, "print(1)");
    assert_eq!(view.snippets[0].mime_type, "text/plain");
}

#[test]
fn default_context_comes_first_without_dedup() {
    let store = ResourceStore::open_in_memory().unwrap();
    let service = ResourceService::new(&store);
    service.set_rule("coding", "style", "SHOULD", "Use rustfmt").unwrap();
    service.set_rule("me", "style", "MUST", "Be concise").unwrap();
    service.set_snippet("coding", "k", "coding body", None).unwrap();
    service.set_snippet("me", "k", "me body", None).unwrap();
    service.set_summary("coding", "s", "coding summary", None).unwrap();
    service.set_summary("me", "s", "me summary", None).unwrap();

    let view = ContextLoader::new(&store).load(&["coding"]).unwrap();

    for bucket in [&view.rules, &view.snippets, &view.summaries] {
        let contexts: Vec<&str> = bucket.iter().map(|r| r.context.as_str()).collect();
        assert_eq!(contexts, vec!["me", "coding"]);
    }
    assert_eq!(
        view.rule_lines(),
        vec!["MUST: Be concise", "SHOULD: Use rustfmt"]
    );
}

#[test]
fn caller_order_is_preserved_and_me_included_once() {
    let store = ResourceStore::open_in_memory().unwrap();
    let service = ResourceService::new(&store);
    for context in ["me", "work", "coding"] {
        service.set_snippet(context, "k", context, None).unwrap();
    }

    let view = ContextLoader::new(&store)
        .load(&["work", "me", "coding"])
        .unwrap();

    let contents: Vec<&str> = view.snippets.iter().map(|r| r.content.as_str()).collect();
    assert_eq!(contents, vec!["me", "work", "coding"]);
}

#[test]
fn per_context_contribution_is_key_ordered() {
    let store = ResourceStore::open_in_memory().unwrap();
    let service = ResourceService::new(&store);
    service.set_snippet("coding", "b", "x", None).unwrap();
    service.set_snippet("coding", "a", "x", None).unwrap();
    service.set_snippet("me", "z", "x", None).unwrap();

    let view = ContextLoader::new(&store).load(&["coding"]).unwrap();

    let keys: Vec<(&str, &str)> = view
        .snippets
        .iter()
        .map(|r| (r.context.as_str(), r.key.as_str()))
        .collect();
    assert_eq!(keys, vec![("me", "z"), ("coding", "a"), ("coding", "b")]);
}

#[test]
fn empty_store_loads_empty_view() {
    let store = ResourceStore::open_in_memory().unwrap();

    let no_extras: [&str; 0] = [];
    let view = ContextLoader::new(&store).load(&no_extras).unwrap();

    assert_eq!(view.contexts, vec!["me"]);
    assert!(view.is_empty());
}

#[test]
fn unknown_context_contributes_nothing() {
    let store = ResourceStore::open_in_memory().unwrap();
    let service = ResourceService::new(&store);
    service.set_summary("me", "s", "body", None).unwrap();

    let view = ContextLoader::new(&store)
        .load(&["missing".to_string()])
        .unwrap();

    assert_eq!(view.summaries.len(), 1);
    assert_eq!(view.summaries[0].kind, ResourceKind::Summary);
}
