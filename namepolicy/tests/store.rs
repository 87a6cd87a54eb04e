use namepolicy::*;

#[test]
fn policy_store_from_file() {
    let store = read_policy_store("tests/examples/policy_store.json").unwrap();
    assert_eq!(3, store.list().unwrap().len());

    let db = PolicyDb::new(store, "ca1");
    assert_eq!("ca1", db.authority_id());

    let policies = db.get_policies().unwrap();
    assert_eq!(1, policies.len());
    assert_eq!("web servers", policies[0].name);

    assert!(matches!(
        db.get_policy("p2"),
        Err(Error::AuthorityMismatch { .. })
    ));
    assert_eq!(Err(Error::Deleted("p3".to_string())), db.get_policy("p3"));
    assert_eq!(Err(Error::NotFound("p4".to_string())), db.get_policy("p4"));

    let engine = db.load_engine("p1").unwrap();
    assert!(engine.allow_literal_wildcard_names());
    assert!(authorize(&engine, &[Identifier::dns("*.a.web.example.com")], None).is_allowed());
    assert!(!authorize(&engine, &[Identifier::dns("*.web.example.com")], None).is_allowed());
    assert!(!authorize(&engine, &[Identifier::dns("web.example.com")], None).is_allowed());
}

#[test]
fn policy_store_errors() {
    assert_eq!(
        Err(Error::StdIoError(std::io::ErrorKind::NotFound)),
        read_policy_store("tests/examples/no_such_store.json").map(|_| ())
    );
    assert!(matches!(
        read_policy_store("tests/examples/policy_malformed.json"),
        Err(Error::ParseError(_))
    ));
}

#[test]
fn put_and_reload() {
    let mut db = PolicyDb::new(MemoryPolicyStore::new(), "ca1");
    let mut settings = NamePolicySettings::default();
    settings.permitted.email_addresses = Some(vec!["@example.com".to_string()]);
    let record = PolicyRecord {
        id: "mail".to_string(),
        authority_id: "ca1".to_string(),
        name: "mail".to_string(),
        settings,
        deleted: false,
    };
    db.put_policy(&record).unwrap();

    let engine = db.load_engine("mail").unwrap();
    assert!(authorize(&engine, &[Identifier::email("a@x.example.com")], None).is_allowed());
    assert!(!authorize(&engine, &[Identifier::email("a@example.org")], None).is_allowed());

    db.delete_policy("mail").unwrap();
    assert_eq!(Err(Error::Deleted("mail".to_string())), db.load_engine("mail"));
}
