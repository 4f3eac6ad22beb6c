//! Scope and audience matching strategies.
//!
//! A scope strategy decides whether one requested scope is covered by the
//! scopes registered for a key. An audience strategy decides whether every
//! requested audience is covered by a set of allowed audiences.
//!
//! Any closure with the matching signature is also a strategy:
//!
//! ```
//! use jwtbearer_grant::strategy::ScopeStrategy;
//!
//! let case_insensitive = |registered: &[String], requested: &str| {
//!     registered.iter().any(|s| s.eq_ignore_ascii_case(requested))
//! };
//! assert!(case_insensitive.matches(&["Read".to_string()], "read"));
//! ```

use url::Url;

/// Decides whether a requested scope is covered by registered scopes.
pub trait ScopeStrategy: Send + Sync {
    /// Returns `true` if `requested` is allowed by `registered`.
    fn matches(&self, registered: &[String], requested: &str) -> bool;
}

impl<F> ScopeStrategy for F
where
    F: Fn(&[String], &str) -> bool + Send + Sync,
{
    fn matches(&self, registered: &[String], requested: &str) -> bool {
        self(registered, requested)
    }
}

/// A scope matches only a registered scope with the same value.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactScopeStrategy;

impl ScopeStrategy for ExactScopeStrategy {
    fn matches(&self, registered: &[String], requested: &str) -> bool {
        registered.iter().any(|s| s == requested)
    }
}

/// A registered scope also covers every dot-separated child scope.
///
/// `photos` covers `photos`, `photos.read` and `photos.read.thumbnails`,
/// but not `photosharing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HierarchicScopeStrategy;

impl ScopeStrategy for HierarchicScopeStrategy {
    fn matches(&self, registered: &[String], requested: &str) -> bool {
        registered.iter().any(|scope| {
            requested == scope
                || requested
                    .strip_prefix(scope.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }
}

/// Registered scopes may contain `*` segments matching exactly one
/// dot-separated segment of the requested scope.
///
/// `users.*.read` covers `users.alice.read` but not `users.read` or
/// `users.alice.bob.read`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WildcardScopeStrategy;

impl ScopeStrategy for WildcardScopeStrategy {
    fn matches(&self, registered: &[String], requested: &str) -> bool {
        let needle: Vec<&str> = requested.split('.').collect();
        registered.iter().any(|scope| {
            if scope == requested {
                return true;
            }
            if !scope.contains('*') {
                return false;
            }
            let pattern: Vec<&str> = scope.split('.').collect();
            pattern.len() == needle.len()
                && pattern
                    .iter()
                    .zip(&needle)
                    .all(|(p, n)| *p == "*" || p == n)
        })
    }
}

/// Decides whether requested audiences are covered by allowed audiences.
pub trait AudienceStrategy: Send + Sync {
    /// Returns `true` if every value of `requested` is allowed by `allowed`.
    fn matches(&self, allowed: &[String], requested: &[String]) -> bool;
}

impl<F> AudienceStrategy for F
where
    F: Fn(&[String], &[String]) -> bool + Send + Sync,
{
    fn matches(&self, allowed: &[String], requested: &[String]) -> bool {
        self(allowed, requested)
    }
}

/// Each requested audience must equal an allowed audience.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactAudienceStrategy;

impl AudienceStrategy for ExactAudienceStrategy {
    fn matches(&self, allowed: &[String], requested: &[String]) -> bool {
        requested.iter().all(|r| allowed.contains(r))
    }
}

/// Each requested audience must be a URL with the scheme and host of an
/// allowed audience and a path equal to or below the allowed path.
///
/// `https://api.example/v1` covers `https://api.example/v1/patients` but not
/// `https://api.example/v10` or `http://api.example/v1`. Values that do not
/// parse as URLs never match.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlAudienceStrategy;

impl UrlAudienceStrategy {
    fn covers(allowed: &Url, requested: &Url) -> bool {
        if allowed.scheme() != requested.scheme()
            || allowed.host_str() != requested.host_str()
            || allowed.port_or_known_default() != requested.port_or_known_default()
        {
            return false;
        }

        let base = allowed.path().trim_end_matches('/');
        let path = requested.path();
        path == allowed.path()
            || path == base
            || path
                .strip_prefix(base)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

impl AudienceStrategy for UrlAudienceStrategy {
    fn matches(&self, allowed: &[String], requested: &[String]) -> bool {
        let allowed: Vec<Url> = allowed.iter().filter_map(|a| Url::parse(a).ok()).collect();
        requested.iter().all(|r| match Url::parse(r) {
            Ok(requested) => allowed.iter().any(|a| Self::covers(a, &requested)),
            Err(_) => false,
        })
    }
}
