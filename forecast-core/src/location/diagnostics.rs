use serde::Serialize;

use super::{Geolocation, PermissionState};

/// Snapshot of what a platform can do, for troubleshooting failed lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub supported: bool,
    pub secure_context: bool,
    pub permission_api: bool,
    /// `Ok(state)` when the query succeeded, `Err(message)` when it failed,
    /// absent when there is no permission API.
    pub permission_state: Option<Result<String, String>>,
}

/// Probe `platform` without requesting a position.
pub async fn diagnose(platform: &dyn Geolocation) -> Diagnostics {
    let permission_api = platform.supports_permission_query();

    let permission_state = if permission_api {
        Some(
            platform
                .query_permission()
                .await
                .map(|status| state_name(status.state).to_string())
                .map_err(|e| e.to_string()),
        )
    } else {
        None
    };

    let diagnostics = Diagnostics {
        supported: platform.is_supported(),
        secure_context: platform.is_secure_context(),
        permission_api,
        permission_state,
    };
    tracing::debug!(?diagnostics, "geolocation diagnostics");
    diagnostics
}

fn state_name(state: PermissionState) -> &'static str {
    match state {
        PermissionState::Granted => "granted",
        PermissionState::Denied => "denied",
        PermissionState::Prompt => "prompt",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::tests::{Behavior, MockPlatform};
    use crate::location::{FixedGeolocation, PositionErrorCode};
    use crate::model::Coordinate;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn fixed_platform_has_no_permission_api() {
        let coords = Coordinate::new(0.0, 0.0).expect("valid coordinate");
        let d = diagnose(&FixedGeolocation::new(coords)).await;

        assert!(d.supported);
        assert!(d.secure_context);
        assert!(!d.permission_api);
        assert_eq!(d.permission_state, None);
    }

    #[tokio::test]
    async fn reports_permission_state_without_requesting() {
        let mut platform = MockPlatform::new(Behavior::Fail(PositionErrorCode::Timeout));
        platform.permission = Some(Ok(PermissionState::Prompt));
        platform.secure = false;

        let d = diagnose(&platform).await;

        assert!(!d.secure_context);
        assert_eq!(d.permission_state, Some(Ok("prompt".to_string())));
        assert_eq!(platform.requests.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reports_query_failure() {
        let mut platform = MockPlatform::new(Behavior::Silent);
        platform.permission = Some(Err(()));

        let d = diagnose(&platform).await;

        assert!(matches!(d.permission_state, Some(Err(_))));
    }
}
