//! Integration tests for binding entries out of a Cfg tree on disk.
//!
//! Each test builds a small repository in a temporary directory, indexes it
//! with the pseudo monitor and binds entries through the public API.

mod common;

use std::sync::Arc;
use std::thread;

use common::prelude::*;

use cfg_repo::candidate::CandidateFile;
use cfg_repo::entry::{AbstractEntry, BoundContent, TransportEncoding};
use cfg_repo::error::{EncodingFailureKind, Error, Result};
use cfg_repo::handlers::{Handler, HandlerRegistry, Role, Verifier};
use cfg_repo::index::EventOutcome;
use cfg_repo::metadata::ClientMetadata;
use cfg_repo::monitor::FileEvent;
use cfg_repo::stages::BindOptions;

fn bind_text(repository: &cfg_repo::repository::CfgRepository, name: &str, client: &ClientMetadata) -> String {
    let mut entry = AbstractEntry::path(name);
    let result = repository.bind(&mut entry, client).unwrap();
    result.text().unwrap().to_string()
}

#[test]
fn test_host_file_beats_default() {
    let fixture = CfgFixture::new()
        .with_file("etc/motd/motd", "welcome\n")
        .with_file("etc/motd/motd.H_web01", "welcome to web01\n");
    let repository = fixture.repository();

    assert_eq!(bind_text(&repository, "/etc/motd", &client("web01", &[])), "welcome to web01\n");
    assert_eq!(bind_text(&repository, "/etc/motd", &client("db01", &[])), "welcome\n");
}

#[test]
fn test_group_file_for_group_members_only() {
    let fixture = CfgFixture::new()
        .with_file("etc/ssh/sshd_config/sshd_config", "PermitRootLogin yes\n")
        .with_file("etc/ssh/sshd_config/sshd_config.G50_secure", "PermitRootLogin no\n");
    let repository = fixture.repository();

    assert_eq!(
        bind_text(&repository, "/etc/ssh/sshd_config", &client("web01", &["secure:50"])),
        "PermitRootLogin no\n"
    );
    assert_eq!(
        bind_text(&repository, "/etc/ssh/sshd_config", &client("web01", &["web"])),
        "PermitRootLogin yes\n"
    );
}

#[test]
fn test_higher_group_priority_wins() {
    let fixture = CfgFixture::new()
        .with_file("etc/motd/motd.G10_web", "web\n")
        .with_file("etc/motd/motd.G90_secure", "secure\n");
    let repository = fixture.repository();

    let both = client("web01", &["web:10", "secure:90"]);
    assert_eq!(bind_text(&repository, "/etc/motd", &both), "secure\n");
}

#[test]
fn test_missing_generator_leaves_entry_untouched() {
    let fixture = CfgFixture::new().with_file("etc/motd/motd.H_db01", "db only\n");
    let repository = fixture.repository();

    let mut entry = AbstractEntry::path("/etc/motd").with_attribute("owner", "nobody");
    let before = entry.clone();
    let err = repository.bind(&mut entry, &client("web01", &[])).unwrap_err();
    assert!(matches!(err, Error::MissingGenerator { ref entry } if entry == "/etc/motd"));
    assert_eq!(entry, before);
}

#[test]
fn test_binary_content_needs_base64() {
    let binary: &[u8] = &[0x7f, b'E', b'L', b'F', 0x00, 0x01];
    let fixture = CfgFixture::new()
        .with_binary("usr/bin/tool/tool", binary)
        .with_binary("etc/latin/latin", &[b'c', b'a', b'f', 0xe9, b'\n']);
    let repository = fixture.repository();
    let web01 = client("web01", &[]);

    let mut entry = AbstractEntry::path("/usr/bin/tool").with_attribute("encoding", "base64");
    let result = repository.bind(&mut entry, &web01).unwrap();
    assert_eq!(result.encoding, TransportEncoding::Base64);
    assert_eq!(result.text(), Some("f0VMRgAB"));

    let mut entry = AbstractEntry::path("/usr/bin/tool");
    let err = repository.bind(&mut entry, &web01).unwrap_err();
    assert!(matches!(
        err,
        Error::EncodingFailure {
            kind: EncodingFailureKind::Base64Required,
            ..
        }
    ));

    let mut entry = AbstractEntry::path("/etc/latin");
    let err = repository.bind(&mut entry, &web01).unwrap_err();
    assert!(matches!(
        err,
        Error::EncodingFailure {
            kind: EncodingFailureKind::Decode,
            ..
        }
    ));
}

#[test]
fn test_latin1_repository_decodes_text() {
    let fixture = CfgFixture::new().with_binary("etc/latin/latin", &[b'c', b'a', b'f', 0xe9, b'\n']);
    let options = BindOptions {
        encoding: "latin-1".parse().unwrap(),
        ..BindOptions::default()
    };
    let repository = fixture.repository_with(HandlerRegistry::builtin(), options);
    assert_eq!(bind_text(&repository, "/etc/latin", &client("web01", &[])), "café\n");
}

#[test]
fn test_empty_file_binds_as_empty() {
    let fixture = CfgFixture::new().with_file("etc/nologin/nologin", "");
    let repository = fixture.repository();

    let mut entry = AbstractEntry::path("/etc/nologin");
    let result = repository.bind(&mut entry, &client("web01", &[])).unwrap();
    assert_eq!(result.content, BoundContent::Empty);
    assert!(entry.empty);
    assert_eq!(entry.get("empty"), Some("true"));
}

#[test]
fn test_info_xml_and_template() {
    let fixture = CfgFixture::new()
        .with_file("etc/motd/motd.genshi", "Hello ${hostname}\n")
        .with_file(
            "etc/motd/info.xml",
            r#"<FileInfo>
  <Group name="secure">
    <Info owner="root" group="wheel" perms="0600"/>
  </Group>
  <Info owner="root" group="root" perms="0644"/>
</FileInfo>"#,
        );
    let repository = fixture.repository();

    let mut entry = AbstractEntry::path("/etc/motd");
    let result = repository
        .bind(&mut entry, &client("web01", &["secure"]))
        .unwrap();
    assert_eq!(result.text(), Some("Hello web01\n"));
    assert_eq!(result.attributes["perms"], "0600");
    assert_eq!(result.attributes["group"], "wheel");
    assert_eq!(result.attributes["type"], "file");

    let mut entry = AbstractEntry::path("/etc/motd");
    let result = repository.bind(&mut entry, &client("db01", &[])).unwrap();
    assert_eq!(result.text(), Some("Hello db01\n"));
    assert_eq!(result.attributes["perms"], "0644");
}

#[test]
fn test_cat_filter_applies_after_generator() {
    let fixture = CfgFixture::new()
        .with_file("etc/hosts.allow/hosts.allow", "sshd: ALL\nin.telnetd: ALL\n")
        .with_file("etc/hosts.allow/hosts.allow.G20_secure.cat", "-in.telnetd: ALL\n+sshd: 10.0.0.0/8\n");
    let repository = fixture.repository();

    assert_eq!(
        bind_text(&repository, "/etc/hosts.allow", &client("web01", &["secure:20"])),
        "sshd: ALL\nsshd: 10.0.0.0/8\n"
    );
    assert_eq!(
        bind_text(&repository, "/etc/hosts.allow", &client("web01", &[])),
        "sshd: ALL\nin.telnetd: ALL\n"
    );
}

#[test]
fn test_filters_run_least_specific_first() {
    let fixture = CfgFixture::new()
        .with_file("etc/x/x", "base\n")
        .with_file("etc/x/x.cat", "+one\n")
        .with_file("etc/x/x.G10_a.cat", "-one\n+two\n")
        .with_file("etc/x/x.H_h.cat", "-two\n+three\n");
    let repository = fixture.repository();

    assert_eq!(bind_text(&repository, "/etc/x", &client("h", &["a:10"])), "base\nthree\n");
    assert_eq!(bind_text(&repository, "/etc/x", &client("other", &["a:10"])), "base\ntwo\n");
    assert_eq!(bind_text(&repository, "/etc/x", &client("h", &[])), "base\nthree\n");
    assert_eq!(bind_text(&repository, "/etc/x", &client("other", &[])), "base\none\n");
}

#[test]
fn test_cat_filter_keeps_source_encoding() {
    let fixture = CfgFixture::new()
        .with_binary("etc/latin/latin", &[b'c', b'a', b'f', 0xe9, b'\n'])
        .with_file("etc/latin/latin.cat", "+extra\n");
    let options = BindOptions {
        encoding: "latin-1".parse().unwrap(),
        ..BindOptions::default()
    };
    let repository = fixture.repository_with(HandlerRegistry::builtin(), options);
    assert_eq!(
        bind_text(&repository, "/etc/latin", &client("web01", &[])),
        "caf\u{e9}\nextra\n"
    );
}

#[test]
fn test_cat_filter_does_not_hide_invalid_text() {
    let fixture = CfgFixture::new()
        .with_binary("etc/motd/motd", &[b'a', 0xff, 0xfe, b'\n'])
        .with_file("etc/motd/motd.cat", "+extra\n");
    let repository = fixture.repository();

    let mut entry = AbstractEntry::path("/etc/motd");
    let err = repository.bind(&mut entry, &client("web01", &[])).unwrap_err();
    assert!(matches!(
        err,
        Error::EncodingFailure {
            kind: EncodingFailureKind::Decode,
            ..
        }
    ));
}

#[test]
fn test_cat_filter_on_base64_content() {
    let fixture = CfgFixture::new()
        .with_binary("usr/bin/tool/tool", &[0x7f, b'E', b'L', b'F', 0x00, 0xff, b'\n'])
        .with_file("usr/bin/tool/tool.cat", "+x\n");
    let repository = fixture.repository();

    let mut entry = AbstractEntry::path("/usr/bin/tool").with_attribute("encoding", "base64");
    let result = repository.bind(&mut entry, &client("web01", &[])).unwrap();
    assert_eq!(result.encoding, TransportEncoding::Base64);
    assert_eq!(result.text(), Some("f0VMRgD/CngK"));
}

#[test]
fn test_bind_is_idempotent() {
    let fixture = CfgFixture::new()
        .with_file("etc/motd/motd", "welcome\n")
        .with_file("etc/motd/info.xml", r#"<FileInfo><Info owner="daemon" perms="0640"/></FileInfo>"#);
    let repository = fixture.repository();
    let web01 = client("web01", &[]);

    let mut first = AbstractEntry::path("/etc/motd");
    let mut second = AbstractEntry::path("/etc/motd");
    let a = repository.bind(&mut first, &web01).unwrap();
    let b = repository.bind(&mut second, &web01).unwrap();
    assert_eq!(a, b);
    assert_eq!(first, second);

    let again = repository.bind(&mut first, &web01).unwrap();
    assert_eq!(again, a);
}

#[test]
fn test_delete_and_recreate_restores_binding() {
    let fixture = CfgFixture::new()
        .with_file("etc/motd/motd", "welcome\n")
        .with_file("etc/motd/motd.H_web01", "web01 only\n");
    let repository = fixture.repository();
    let web01 = client("web01", &[]);
    let host_file = fixture.root().join("etc/motd/motd.H_web01");

    std::fs::remove_file(&host_file).unwrap();
    assert!(matches!(
        repository.handle_event(&FileEvent::deleted(&host_file)),
        EventOutcome::Removed
    ));
    assert_eq!(bind_text(&repository, "/etc/motd", &web01), "welcome\n");

    std::fs::write(&host_file, "web01 again\n").unwrap();
    assert!(matches!(
        repository.handle_event(&FileEvent::created(&host_file)),
        EventOutcome::Indexed { .. }
    ));
    assert_eq!(bind_text(&repository, "/etc/motd", &web01), "web01 again\n");
}

#[test]
fn test_unclassified_and_ignored_files() {
    let fixture = CfgFixture::new()
        .with_file("etc/motd/motd", "welcome\n")
        .with_file("etc/motd/motd.Gxx_web", "bad token\n")
        .with_file("etc/motd/unrelated", "stray\n");
    let repository = fixture.repository();
    let set = repository.entry_set("/etc/motd").unwrap().unwrap();
    assert_eq!(set.len(), 1);
    assert_eq!(bind_text(&repository, "/etc/motd", &client("web01", &["web"])), "welcome\n");
}

#[test]
fn test_binds_during_events() {
    let fixture = CfgFixture::new()
        .with_file("etc/motd/motd", "welcome\n")
        .with_file("etc/motd/motd.H_web01", "version 0\n");
    let repository = Arc::new(fixture.repository());
    let host_file = fixture.root().join("etc/motd/motd.H_web01");

    let writer = {
        let repository = Arc::clone(&repository);
        let host_file = host_file.clone();
        thread::spawn(move || {
            for version in 1..=20 {
                std::fs::write(&host_file, format!("version {}\n", version)).unwrap();
                repository.handle_event(&FileEvent::changed(&host_file));
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let repository = Arc::clone(&repository);
            thread::spawn(move || {
                let web01 = ClientMetadata::new("web01");
                for _ in 0..50 {
                    let text = bind_text(&repository, "/etc/motd", &web01);
                    assert!(text.starts_with("version "), "unexpected content {:?}", text);
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(bind_text(&repository, "/etc/motd", &client("web01", &[])), "version 20\n");
}

/// Fails when the content is longer than the number in its `:maxlen` file.
struct MaxLengthVerifier;

impl Handler for MaxLengthVerifier {
    fn name(&self) -> &'static str {
        "MaxLengthVerifier"
    }

    fn basenames(&self) -> &'static [&'static str] {
        &[":maxlen"]
    }

    fn role(&self) -> Role<'_> {
        Role::Verifier(self)
    }
}

impl Verifier for MaxLengthVerifier {
    fn verify(&self, file: &CandidateFile, entry: &AbstractEntry, client: &ClientMetadata, data: &[u8]) -> Result<()> {
        let limit: usize = file.text().trim().parse().map_err(|_| Error::VerificationFailure {
            entry: entry.name.clone(),
            client: client.hostname.clone(),
            message: format!("{} is not a number", file.filename),
        })?;
        if data.len() > limit {
            return Err(Error::VerificationFailure {
                entry: entry.name.clone(),
                client: client.hostname.clone(),
                message: format!("{} bytes exceeds the limit of {}", data.len(), limit),
            });
        }
        Ok(())
    }
}

#[cfg(unix)]
mod verifiers {
    use super::*;

    fn registry() -> HandlerRegistry {
        HandlerRegistry::builtin().with_handler_first(MaxLengthVerifier)
    }

    #[test]
    fn test_both_verifiers_pass() {
        let fixture = CfgFixture::new()
            .with_file("etc/motd/motd", "welcome\n")
            .with_file("etc/motd/:maxlen", "100\n")
            .with_script("etc/motd/:test", "#!/bin/sh\ncat > /dev/null\nexit 0\n");
        let repository = fixture.repository_with(registry(), BindOptions::default());
        assert_eq!(bind_text(&repository, "/etc/motd", &client("web01", &[])), "welcome\n");
    }

    #[test]
    fn test_command_failure_fails_bind() {
        let fixture = CfgFixture::new()
            .with_file("etc/motd/motd", "welcome\n")
            .with_file("etc/motd/:maxlen", "100\n")
            .with_script("etc/motd/:test", "#!/bin/sh\necho 'motd must mention the AUP' >&2\nexit 1\n");
        let repository = fixture.repository_with(registry(), BindOptions::default());

        let mut entry = AbstractEntry::path("/etc/motd");
        let err = repository.bind(&mut entry, &client("web01", &[])).unwrap_err();
        match err {
            Error::VerificationFailure { message, .. } => assert_eq!(message, "motd must mention the AUP"),
            other => panic!("expected VerificationFailure, got {:?}", other),
        }
        assert!(entry.text.is_none());
    }

    #[test]
    fn test_length_failure_fails_bind_after_every_verifier_ran() {
        let fixture = CfgFixture::new()
            .with_file("etc/motd/motd", "a rather long welcome message\n")
            .with_file("etc/motd/:maxlen", "10\n")
            .with_script("etc/motd/:test", "#!/bin/sh\ncat > /dev/null\ntouch \"$0.ran\"\nexit 0\n");
        let repository = fixture.repository_with(registry(), BindOptions::default());

        let mut entry = AbstractEntry::path("/etc/motd");
        let err = repository.bind(&mut entry, &client("web01", &[])).unwrap_err();
        match err {
            Error::VerificationFailure { message, .. } => {
                assert_eq!(message, "30 bytes exceeds the limit of 10")
            }
            other => panic!("expected VerificationFailure, got {:?}", other),
        }
        assert!(fixture.root().join("etc/motd/:test.ran").exists());
    }

    #[test]
    fn test_no_validate_skips_verifiers() {
        let fixture = CfgFixture::new()
            .with_file("etc/motd/motd", "welcome\n")
            .with_script("etc/motd/:test", "#!/bin/sh\nexit 1\n");
        let options = BindOptions::default().with_validate(false);
        let repository = fixture.repository_with(registry(), options);
        assert_eq!(bind_text(&repository, "/etc/motd", &client("web01", &[])), "welcome\n");
    }

    #[test]
    fn test_host_specific_verifier_wins() {
        let fixture = CfgFixture::new()
            .with_file("etc/motd/motd", "welcome\n")
            .with_file("etc/motd/:maxlen", "1\n")
            .with_file("etc/motd/:maxlen.H_web01", "100\n");
        let repository = fixture.repository_with(registry(), BindOptions::default());

        assert_eq!(bind_text(&repository, "/etc/motd", &client("web01", &[])), "welcome\n");
        let mut entry = AbstractEntry::path("/etc/motd");
        assert!(repository.bind(&mut entry, &client("db01", &[])).is_err());
    }
}
