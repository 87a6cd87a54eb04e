use namepolicy::*;

#[test]
fn read_basic_settings() {
    let settings = read_settings(&Some("tests/examples/policy_basic.json".to_string())).unwrap();
    assert!(settings.verify_subject_common_name);
    assert!(!settings.allow_literal_wildcard_names);
    assert_eq!(None, settings.excluded.email_addresses);

    let engine = NamePolicyEngine::from_settings(&settings).unwrap();
    assert_eq!(2, engine.permitted().dns_domains.len());
    assert_eq!(2, engine.excluded().len());

    let allowed = [
        Identifier::dns("www.example.com"),
        Identifier::dns("a.example.net"),
        Identifier::ip("10.1.2.3"),
        Identifier::email("alice@mail.example.com"),
        Identifier::uri("https://example.com/x"),
        Identifier::principal("ops"),
    ];
    assert!(authorize(&engine, &allowed, Some("www.example.com")).is_allowed());

    let denied = [
        (Identifier::dns("example.net"), DenyReasonCode::NoPermittedMatch),
        (Identifier::dns("db.internal.example.com"), DenyReasonCode::ExcludedMatch),
        (Identifier::ip("10.10.1.1"), DenyReasonCode::ExcludedMatch),
        (Identifier::ip("192.168.1.1"), DenyReasonCode::NoPermittedMatch),
        (Identifier::principal("root"), DenyReasonCode::NoPermittedMatch),
        (Identifier::dns("*.example.com"), DenyReasonCode::DisallowedWildcard),
        (Identifier::uri("::"), DenyReasonCode::MalformedIdentifier),
    ];
    for (id, expected) in denied {
        let verdict = authorize(&engine, &[id.clone()], None);
        assert_eq!(
            Some(expected),
            verdict.denial().map(|d| d.reason.code()),
            "{}",
            id
        );
    }

    let verdict = authorize(&engine, &allowed, Some("intranet.local"));
    assert_eq!("intranet.local", verdict.denial().unwrap().identifier);
}

#[test]
fn exported_settings_rebuild_same_engine() {
    let settings = read_settings(&Some("tests/examples/policy_basic.json".to_string())).unwrap();
    let engine = NamePolicyEngine::from_settings(&settings).unwrap();

    let json = engine.to_settings().to_json().unwrap();
    let reread = NamePolicySettings::from_json(json.as_bytes()).unwrap();
    assert_eq!(engine, NamePolicyEngine::from_settings(&reread).unwrap());
}

#[test]
fn settings_failures() {
    let settings = read_settings(&Some(
        "tests/examples/policy_invalid_constraint.json".to_string(),
    ))
    .unwrap();
    let err = NamePolicyEngine::from_settings(&settings).unwrap_err();
    assert_eq!(
        Error::InvalidConstraint {
            kind: ConstraintKind::Dns,
            raw: "www..example.com".to_string(),
            violation: ConstraintViolation::EmptyLabel,
        },
        err
    );

    assert!(matches!(
        read_settings(&Some("tests/examples/policy_malformed.json".to_string())),
        Err(Error::ParseError(_))
    ));
    assert_eq!(
        Err(Error::StdIoError(std::io::ErrorKind::NotFound)),
        read_settings(&Some("tests/examples/no_such_policy.json".to_string()))
    );
}

#[test]
fn settings_from_temp_file() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("policy.json");

    let mut settings = NamePolicySettings::default();
    settings.excluded.principals = Some(vec!["root".to_string()]);
    std::fs::write(&p, settings.to_json().unwrap()).unwrap();

    let read = read_settings(&Some(p.to_str().unwrap().to_string())).unwrap();
    assert_eq!(settings, read);
    let engine = NamePolicyEngine::from_settings(&read).unwrap();
    assert!(!authorize(&engine, &[Identifier::principal("root")], None).is_allowed());
    assert!(authorize(&engine, &[Identifier::principal("admin")], None).is_allowed());
}
