use super::*;
use crate::core::error::Error as LauncherError;
use crate::runtime::Outcome;
use std::io;

#[cfg(test)]
mod error_creation_tests {
    use super::*;

    #[test]
    fn test_constructor_methods() {
        let errors = vec![
            (
                CliError::invalid_input("nothing to change"),
                "InvalidInput",
                "nothing to change",
            ),
            (
                CliError::configuration("no executable directory"),
                "Configuration",
                "no executable directory",
            ),
            (
                CliError::cancelled("delete of a.ps1"),
                "Cancelled",
                "delete of a.ps1",
            ),
        ];

        for (error, expected_variant, expected_msg) in errors {
            let error_str = format!("{:?}", error);
            assert!(
                error_str.contains(expected_variant),
                "Error {:?} should contain variant {}",
                error,
                expected_variant
            );
            assert!(
                error.to_string().contains(expected_msg),
                "Error {} should contain message {}",
                error,
                expected_msg
            );
        }
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::invalid_input("x").exit_code(), 1);
        assert_eq!(CliError::cancelled("x").exit_code(), 0);
        assert_eq!(
            CliError::ScriptFailed {
                name: "a.ps1".to_string(),
                outcome: Outcome::Failed(3),
            }
            .exit_code(),
            2
        );
    }
}

#[cfg(test)]
mod error_conversion_tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io_errors = vec![
            (io::ErrorKind::NotFound, "entity not found"),
            (io::ErrorKind::PermissionDenied, "permission denied"),
            (io::ErrorKind::Interrupted, "operation interrupted"),
        ];

        for (kind, msg) in io_errors {
            let cli_error: CliError = io::Error::new(kind, msg).into();
            match cli_error {
                CliError::Io(e) => {
                    assert_eq!(e.kind(), kind);
                    assert_eq!(e.to_string(), msg);
                }
                _ => panic!("Expected Io error"),
            }
        }
    }

    #[test]
    fn test_launcher_error_conversion_keeps_message() {
        let cli_error: CliError = LauncherError::UnsupportedScriptType("notes.txt".into()).into();
        assert!(matches!(cli_error, CliError::Launcher(_)));
        assert_eq!(cli_error.to_string(), "Unsupported script type: notes.txt");
    }

    #[test]
    fn test_serde_error_conversion() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let cli_error: CliError = serde_err.into();
        assert!(cli_error.to_string().starts_with("Serialization error:"));
    }
}

#[cfg(test)]
mod user_message_tests {
    use super::*;

    #[test]
    fn test_user_friendly_messages() {
        let message =
            CliError::from(LauncherError::ScriptNotFound("backup.ps1".into())).user_message();
        assert!(message.contains("backup.ps1"));
        assert!(message.contains("yonky list"));

        let message =
            CliError::from(LauncherError::ScriptHostNotFound("pwsh".into())).user_message();
        assert!(message.contains("pwsh"));
        assert!(message.contains("--script-host"));

        let message =
            CliError::from(LauncherError::InvalidScriptName("../x".into())).user_message();
        assert!(message.contains("not a valid script name"));

        let message = CliError::ScriptFailed {
            name: "deploy.cmd".into(),
            outcome: Outcome::Failed(7),
        }
        .user_message();
        assert_eq!(message, "Script 'deploy.cmd' exited with code 7.");

        let message = CliError::ScriptFailed {
            name: "slow.ps1".into(),
            outcome: Outcome::TimedOut,
        }
        .user_message();
        assert!(message.contains("timed out"));
    }

    #[test]
    fn test_trait_matches_inherent_method() {
        let error = CliError::invalid_input("bad flag");
        assert_eq!(
            UserFriendlyError::user_message(&error),
            error.user_message()
        );
        assert_eq!(error.user_message(), "Invalid input: bad flag");
    }
}
