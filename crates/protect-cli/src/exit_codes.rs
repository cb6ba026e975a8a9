//! Exit codes for the `protect` binary.
//! These codes are part of the public contract for scripts driving one-shot commands.

use protect_core::reply::SetResult;
use protect_core::{RegistryError, Reply};

pub const SUCCESS: i32 = 0;
pub const DUPLICATE: i32 = 1; // SET rejected: id already protected (reject policy)
pub const INVALID_INPUT: i32 = 2; // Out-of-range argument or bad config
pub const STORE_UNAVAILABLE: i32 = 3; // Durable store could not be opened or written

pub fn for_reply(reply: &Reply) -> i32 {
    match reply {
        Reply::Set(set) if set.result == SetResult::Duplicate => DUPLICATE,
        Reply::Set(_) | Reply::Pull(_) => SUCCESS,
        Reply::Invalid(_) => INVALID_INPUT,
        Reply::Unavailable(_) => STORE_UNAVAILABLE,
    }
}

/// Exit code for an error that ended the command early.
pub fn for_error(err: &anyhow::Error) -> i32 {
    let store_down = err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<RegistryError>(),
            Some(RegistryError::StoreUnavailable(_))
        )
    });
    if store_down {
        STORE_UNAVAILABLE
    } else {
        INVALID_INPUT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use protect_core::ProtectionId;

    #[test]
    fn test_exit_code_mapping() {
        let dup = Reply::from(RegistryError::DuplicateId { id: ProtectionId(1) });
        assert_eq!(for_reply(&dup), DUPLICATE);
        let bad = Reply::from(RegistryError::invalid_input("$.TTL", "0"));
        assert_eq!(for_reply(&bad), INVALID_INPUT);
        let down = Reply::from(RegistryError::StoreUnavailable("x".into()));
        assert_eq!(for_reply(&down), STORE_UNAVAILABLE);
        assert_eq!(
            for_reply(&Reply::Pull(protect_core::reply::PullReply(vec![]))),
            SUCCESS
        );
    }

    #[test]
    fn test_store_errors_keep_their_exit_code_through_context() {
        let closed: anyhow::Result<()> =
            Err(RegistryError::StoreUnavailable("database is locked".into()))
                .context("close protection registry");
        assert_eq!(for_error(&closed.unwrap_err()), STORE_UNAVAILABLE);

        let bad_config = anyhow::anyhow!("unknown variant `sometimes`").context("load config");
        assert_eq!(for_error(&bad_config), INVALID_INPUT);

        let dup: anyhow::Error = RegistryError::DuplicateId { id: ProtectionId(1) }.into();
        assert_eq!(for_error(&dup), INVALID_INPUT);
    }
}
