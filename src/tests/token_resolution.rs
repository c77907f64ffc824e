#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serial_test::serial;
    use tempfile::TempDir;

    use crate::auth::credential::{AccessToken, Credential};
    use crate::auth::profile_store::{
        create_private_file, temp_sibling_path, FileProfileStore, ProfileEntry, ProfileFile, TokenValue,
    };
    use crate::auth::resolver::{TokenProvider, TokenResolver};
    use crate::error::{DirectoryError, Result};

    /// Counts lookups so tests can prove the provider was or was not used.
    #[derive(Default)]
    struct CountingProvider {
        calls: AtomicUsize,
        fail_with: Option<String>,
    }

    impl TokenProvider for CountingProvider {
        async fn get_token(&self, profile_id: &str, _location: Option<&Path>, _persist: bool) -> Result<AccessToken> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.fail_with {
                Some(reason) => Err(DirectoryError::Config(reason.clone())),
                None => Ok(AccessToken::new(format!("token-for-{}", profile_id))),
            }
        }
    }

    fn write_store(dir: &TempDir, yaml: &str) -> PathBuf {
        let path = dir.path().join("profiles.yaml");
        std::fs::write(&path, yaml).unwrap();
        path
    }

    #[tokio::test]
    async fn bearer_token_passes_through_without_provider() {
        let resolver = TokenResolver::new(CountingProvider::default());

        let token = resolver.resolve(&Credential::bearer("ya29.explicit")).await.unwrap();

        assert_eq!(token, "ya29.explicit");
        assert_eq!(resolver_calls(&resolver), 0);
    }

    #[tokio::test]
    async fn bearer_token_is_not_trimmed_or_checked() {
        let resolver = TokenResolver::new(CountingProvider::default());

        let token = resolver.resolve(&Credential::bearer(" ya29.padded ")).await.unwrap();
        let blank = resolver.resolve(&Credential::bearer("")).await.unwrap();

        assert_eq!(token, " ya29.padded ");
        assert_eq!(blank, "");
        assert_eq!(resolver_calls(&resolver), 0);
    }

    #[tokio::test]
    async fn profile_is_delegated_to_the_provider() {
        let resolver = TokenResolver::new(CountingProvider::default());

        let token = resolver.resolve(&Credential::profile("admin")).await.unwrap();

        assert_eq!(token, "token-for-admin");
        assert_eq!(resolver_calls(&resolver), 1);
    }

    #[tokio::test]
    async fn provider_failures_surface_as_auth_errors() {
        let provider = CountingProvider { fail_with: Some("refresh endpoint down".to_owned()), ..Default::default() };
        let resolver = TokenResolver::new(provider);

        let err = resolver.resolve(&Credential::profile("admin")).await.unwrap_err();

        match err {
            DirectoryError::Auth { reason } => {
                assert!(reason.contains("admin"));
                assert!(reason.contains("refresh endpoint down"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    fn resolver_calls(resolver: &TokenResolver<CountingProvider>) -> usize {
        resolver.provider().calls.load(Ordering::SeqCst)
    }

    #[tokio::test]
    async fn literal_profile_resolves_from_store() {
        let dir = TempDir::new().unwrap();
        let path = write_store(&dir, "profiles:\n  admin:\n    access_token:\n      value: ya29.literal\n");
        let resolver = TokenResolver::new(FileProfileStore::new(&path));

        let token = resolver.resolve(&Credential::profile("admin")).await.unwrap();

        assert_eq!(token, "ya29.literal");
    }

    #[tokio::test]
    #[serial]
    async fn env_profile_resolves_from_environment() {
        let dir = TempDir::new().unwrap();
        let path = write_store(&dir, "profiles:\n  ci:\n    access_token:\n      from_env: GDIRECTORY_TEST_TOKEN\n");
        std::env::set_var("GDIRECTORY_TEST_TOKEN", "ya29.from-env");
        let resolver = TokenResolver::new(FileProfileStore::new(&path));

        let token = resolver.resolve(&Credential::profile("ci")).await;
        std::env::remove_var("GDIRECTORY_TEST_TOKEN");

        assert_eq!(token.unwrap(), "ya29.from-env");
    }

    #[tokio::test]
    #[serial]
    async fn unset_env_profile_is_an_auth_error() {
        let dir = TempDir::new().unwrap();
        let path = write_store(&dir, "profiles:\n  ci:\n    access_token:\n      from_env: GDIRECTORY_TEST_UNSET\n");
        std::env::remove_var("GDIRECTORY_TEST_UNSET");
        let resolver = TokenResolver::new(FileProfileStore::new(&path));

        let err = resolver.resolve(&Credential::profile("ci")).await.unwrap_err();

        assert!(matches!(err, DirectoryError::Auth { ref reason } if reason.contains("GDIRECTORY_TEST_UNSET")));
    }

    #[tokio::test]
    async fn file_profile_is_trimmed() {
        let dir = TempDir::new().unwrap();
        let secret = dir.path().join("secret");
        std::fs::write(&secret, "ya29.from-file\n").unwrap();
        let path = write_store(
            &dir,
            &format!("profiles:\n  vault:\n    access_token:\n      path: {}\n", secret.display()),
        );
        let resolver = TokenResolver::new(FileProfileStore::new(&path));

        let token = resolver.resolve(&Credential::profile("vault")).await.unwrap();

        assert_eq!(token, "ya29.from-file");
    }

    #[tokio::test]
    async fn missing_profile_is_an_auth_error() {
        let dir = TempDir::new().unwrap();
        let path = write_store(&dir, "profiles:\n  admin:\n    access_token:\n      value: x\n");
        let resolver = TokenResolver::new(FileProfileStore::new(&path));

        let err = resolver.resolve(&Credential::profile("ghost")).await.unwrap_err();

        assert!(matches!(err, DirectoryError::Auth { ref reason } if reason.contains("'ghost' does not exist")));
    }

    #[tokio::test]
    async fn missing_store_is_an_auth_error() {
        let dir = TempDir::new().unwrap();
        let resolver = TokenResolver::new(FileProfileStore::new(dir.path().join("absent.yaml")));

        let err = resolver.resolve(&Credential::profile("admin")).await.unwrap_err();

        assert!(matches!(err, DirectoryError::Auth { .. }));
    }

    #[tokio::test]
    async fn empty_literal_token_is_an_auth_error() {
        let dir = TempDir::new().unwrap();
        let path = write_store(&dir, "profiles:\n  admin:\n    access_token:\n      value: \"\"\n");
        let resolver = TokenResolver::new(FileProfileStore::new(&path));

        let err = resolver.resolve(&Credential::profile("admin")).await.unwrap_err();

        assert!(matches!(err, DirectoryError::Auth { .. }));
    }

    #[tokio::test]
    async fn explicit_location_overrides_the_default_store() {
        let dir = TempDir::new().unwrap();
        let path = write_store(&dir, "profiles:\n  admin:\n    access_token:\n      value: ya29.elsewhere\n");
        let resolver = TokenResolver::new(FileProfileStore::new(dir.path().join("default.yaml")));
        let credential = Credential::Profile { id: "admin".to_owned(), location: Some(path), persist: false };

        let token = resolver.resolve(&credential).await.unwrap();

        assert_eq!(token, "ya29.elsewhere");
    }

    #[tokio::test]
    async fn persist_rewrites_the_profile_as_literal() {
        let dir = TempDir::new().unwrap();
        let secret = dir.path().join("secret");
        std::fs::write(&secret, "ya29.rotated").unwrap();
        let path = write_store(
            &dir,
            &format!(
                "profiles:\n  admin:\n    access_token:\n      path: {}\n  other:\n    access_token:\n      value: keep\n",
                secret.display()
            ),
        );
        let resolver = TokenResolver::new(FileProfileStore::new(&path));
        let credential = Credential::Profile { id: "admin".to_owned(), location: None, persist: true };

        let token = resolver.resolve(&credential).await.unwrap();
        assert_eq!(token, "ya29.rotated");

        let stored: ProfileFile = FileProfileStore::load(&path).await.unwrap();
        let admin = &stored.profiles["admin"];
        assert_eq!(admin.access_token, TokenValue::Literal { value: "ya29.rotated".to_owned() });
        assert!(admin.persisted_at.is_some());
        assert_eq!(stored.profiles["other"].access_token, TokenValue::Literal { value: "keep".to_owned() });
        let mut entries: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        entries.sort();
        assert_eq!(entries, vec!["profiles.yaml", "secret"]);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn tmp_file_is_private_before_anything_is_written() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let tmp = temp_sibling_path(&dir.path().join("profiles.yaml"));

        let file = create_private_file(&tmp).await.unwrap();
        let mode = std::fs::metadata(&tmp).unwrap().permissions().mode();
        drop(file);

        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(std::fs::metadata(&tmp).unwrap().len(), 0);
        // an existing tmp file is never reused
        assert!(create_private_file(&tmp).await.is_err());
    }

    #[test]
    fn tmp_files_are_unique_siblings() {
        let target = Path::new("/var/lib/gdirectory/profiles.yaml");

        let first = temp_sibling_path(target);
        let second = temp_sibling_path(target);

        assert_ne!(first, second);
        assert_eq!(first.parent(), target.parent());
        let name = first.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(".profiles.yaml.") && name.ends_with(".tmp"), "{}", name);
    }

    #[tokio::test]
    async fn concurrent_saves_leave_a_complete_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("profiles.yaml");
        let store = |token: &str| ProfileFile {
            profiles: [(
                "admin".to_owned(),
                ProfileEntry { access_token: TokenValue::Literal { value: token.to_owned() }, persisted_at: None },
            )]
            .into_iter()
            .collect(),
        };
        let (first, second) = (store("ya29.one"), store("ya29.two"));

        let (a, b) = tokio::join!(FileProfileStore::save(&path, &first), FileProfileStore::save(&path, &second));
        a.unwrap();
        b.unwrap();

        let stored = FileProfileStore::load(&path).await.unwrap();
        let value = &stored.profiles["admin"].access_token;
        assert!(
            *value == TokenValue::Literal { value: "ya29.one".to_owned() }
                || *value == TokenValue::Literal { value: "ya29.two".to_owned() }
        );
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn credential_debug_hides_the_token() {
        let rendered = format!("{:?}", Credential::bearer("ya29.secret"));
        assert!(!rendered.contains("ya29.secret"));
        assert_eq!(format!("{:?}", AccessToken::new("ya29.secret")), "AccessToken(***)");
    }
}
