//! The fixed set of operations the tool can run.

use std::fmt;

/// An operation requested on the command line.
///
/// Tokens keep the historical camelCase spelling (`listVault`, `getFile`,
/// ...). Anything else becomes [`Operation::Unsupported`] so the dispatcher
/// can report it instead of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Create,
    Put,
    ListVault,
    DeleteVault,
    GetFile,
    DeleteFile,
    Unsupported(String),
}

impl Operation {
    pub const TOKENS: [&'static str; 6] = [
        "create",
        "put",
        "listVault",
        "deleteVault",
        "getFile",
        "deleteFile",
    ];

    pub fn parse(token: &str) -> Self {
        match token {
            "create" => Self::Create,
            "put" => Self::Put,
            "listVault" => Self::ListVault,
            "deleteVault" => Self::DeleteVault,
            "getFile" => Self::GetFile,
            "deleteFile" => Self::DeleteFile,
            other => Self::Unsupported(other.to_string()),
        }
    }

    pub fn token(&self) -> &str {
        match self {
            Self::Create => "create",
            Self::Put => "put",
            Self::ListVault => "listVault",
            Self::DeleteVault => "deleteVault",
            Self::GetFile => "getFile",
            Self::DeleteFile => "deleteFile",
            Self::Unsupported(token) => token,
        }
    }

    /// Operations that act on a file (or archive id) besides the vault.
    pub fn needs_file(&self) -> bool {
        matches!(self, Self::Put | Self::GetFile | Self::DeleteFile)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("create", Operation::Create, false)]
    #[case("put", Operation::Put, true)]
    #[case("listVault", Operation::ListVault, false)]
    #[case("deleteVault", Operation::DeleteVault, false)]
    #[case("getFile", Operation::GetFile, true)]
    #[case("deleteFile", Operation::DeleteFile, true)]
    fn known_tokens_round_trip(#[case] token: &str, #[case] op: Operation, #[case] needs_file: bool) {
        let parsed = Operation::parse(token);
        assert_eq!(parsed, op);
        assert_eq!(parsed.token(), token);
        assert_eq!(parsed.needs_file(), needs_file);
    }

    #[test]
    fn tokens_are_case_sensitive() {
        assert_eq!(
            Operation::parse("listvault"),
            Operation::Unsupported("listvault".to_string())
        );
    }

    #[test]
    fn every_advertised_token_is_supported() {
        for token in Operation::TOKENS {
            assert!(!matches!(Operation::parse(token), Operation::Unsupported(_)));
        }
    }
}
