use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.admin_port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        admin_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.admin_addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_are_usable() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.admin_addr.to_string(), "127.0.0.1:3001");
    assert_eq!(settings.server.graceful_shutdown, Duration::from_secs(30));
    assert_eq!(settings.logging.format, LogFormat::Compact);
    assert_eq!(settings.database.url, None);
    assert_eq!(settings.database.max_connections.get(), 8);
    assert_eq!(settings.admin.page_size.get(), DEFAULT_PAGE_SIZE);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.logging.format, LogFormat::Json);
}

#[test]
fn blank_database_url_is_treated_as_missing() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("   ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.database.url, None);
}

#[test]
fn page_size_is_bounded() {
    let mut raw = RawSettings::default();
    raw.admin.page_size = Some(0);
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "admin.page_size",
            ..
        })
    ));

    let mut raw = RawSettings::default();
    raw.admin.page_size = Some(MAX_ADMIN_PAGE_SIZE + 1);
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "admin.page_size",
            ..
        })
    ));
}

#[test]
fn invalid_log_level_is_rejected() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".to_string());

    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "logging.level",
            ..
        })
    ));
}

#[test]
fn zero_admin_port_is_rejected() {
    let mut raw = RawSettings::default();
    raw.server.admin_port = Some(0);

    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "server.admin_port",
            ..
        })
    ));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["sage-blog"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(ServeArgs::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_migrate_arguments() {
    let args = CliArgs::parse_from([
        "sage-blog",
        "migrate",
        "--database-url",
        "postgres://example",
    ]);

    match args.command.expect("migrate command") {
        Command::Migrate(migrate) => {
            assert_eq!(
                migrate.database.database_url.as_deref(),
                Some("postgres://example")
            );
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn migrate_only_overrides_database() {
    let mut raw = RawSettings::default();
    raw.server.admin_port = Some(5000);

    raw.apply_database_override(&DatabaseOverride {
        database_url: Some("postgres://override".to_string()),
    });
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.database.url.as_deref(), Some("postgres://override"));
    assert_eq!(settings.server.admin_addr.port(), 5000);
}
