use figment::Jail;
use tp_config::TallyportConfig;

#[test]
fn env_vars_fill_nested_sections() {
    Jail::expect_with(|jail| {
        jail.set_env("TALLYPORT_SINK__URL", "https://env.supabase.co");
        jail.set_env("TALLYPORT_SINK__SERVICE_KEY", "sk_env");
        jail.set_env("TALLYPORT_SINK__OWNER_ID", "owner-env");
        jail.set_env("TALLYPORT_SYNC__PARALLELISM", "8");

        let config = TallyportConfig::load().expect("config loads");
        assert!(config.sink.is_configured());
        assert_eq!(config.sink.url, "https://env.supabase.co");
        assert_eq!(config.sync.parallelism, 8);
        Ok(())
    });
}

#[test]
fn env_beats_project_toml() {
    Jail::expect_with(|jail| {
        jail.create_dir(".tallyport")?;
        jail.create_file(
            ".tallyport/config.toml",
            r#"
[scope]
company = "From Toml"
"#,
        )?;
        jail.set_env("TALLYPORT_SCOPE__COMPANY", "From Env");

        let config = TallyportConfig::load().expect("config loads");
        assert_eq!(config.scope.company.as_deref(), Some("From Env"));
        Ok(())
    });
}

#[test]
fn zero_parallelism_from_env_is_rejected() {
    Jail::expect_with(|jail| {
        jail.set_env("TALLYPORT_SYNC__PARALLELISM", "0");
        let err = TallyportConfig::load().unwrap_err();
        assert!(err.to_string().contains("sync.parallelism"));
        Ok(())
    });
}
