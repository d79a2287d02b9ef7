//! Request classification.
//!
//! Every intercepted GET is matched against an ordered rule list; the first
//! rule whose matcher accepts the request decides the strategy and partition.
//! Non-GET requests and non-http(s) URLs are never classified.

use serde::Serialize;
use spinezone_core::config::RoutingConfig;
use spinezone_core::{Destination, Method, PartitionKind, Request};

/// Read-through caching algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    NetworkFirst,
    CacheFirst,
}

/// Predicate over a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    PathPrefix(String),
    PathContains(String),
    Destination(Vec<Destination>),
    AcceptsHtml,
    AnyOf(Vec<Matcher>),
    Always,
}

impl Matcher {
    pub fn matches(&self, request: &Request) -> bool {
        match self {
            Matcher::PathPrefix(prefix) => request.url.path().starts_with(prefix.as_str()),
            Matcher::PathContains(marker) => request.url.path().contains(marker.as_str()),
            Matcher::Destination(kinds) => kinds.contains(&request.destination),
            Matcher::AcceptsHtml => request.accepts_html(),
            Matcher::AnyOf(matchers) => matchers.iter().any(|m| m.matches(request)),
            Matcher::Always => true,
        }
    }
}

/// Where a classified request goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct Route {
    pub strategy: Strategy,
    pub partition: PartitionKind,
    /// Serve the offline page instead of propagating a network failure.
    pub offline_fallback: bool,
}

impl Route {
    const fn new(strategy: Strategy, partition: PartitionKind) -> Self {
        Self { strategy, partition, offline_fallback: false }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub name: &'static str,
    pub matcher: Matcher,
    pub route: Route,
}

/// Why a request was not intercepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassReason {
    Method,
    Scheme,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Passthrough(PassReason),
    Route { rule: &'static str, route: Route },
}

/// Ordered classification rules.
#[derive(Debug, Clone)]
pub struct Router {
    rules: Vec<Rule>,
}

impl Router {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// The site's rule list.
    ///
    /// Images land in the dynamic partition unless `dedicated_image_partition`
    /// is set, matching the layout of workers already deployed.
    pub fn from_config(config: &RoutingConfig) -> Self {
        let image_partition =
            if config.dedicated_image_partition { PartitionKind::Images } else { PartitionKind::Dynamic };

        Self::new(vec![
            Rule {
                name: "api",
                matcher: Matcher::PathPrefix(config.api_prefix.clone()),
                route: Route::new(Strategy::NetworkFirst, PartitionKind::Dynamic),
            },
            Rule {
                name: "image",
                matcher: Matcher::Destination(vec![Destination::Image]),
                route: Route::new(Strategy::CacheFirst, image_partition),
            },
            Rule {
                name: "static-asset",
                matcher: Matcher::AnyOf(vec![
                    Matcher::Destination(vec![Destination::Script, Destination::Style, Destination::Font]),
                    Matcher::PathContains(config.static_marker.clone()),
                ]),
                route: Route::new(Strategy::CacheFirst, PartitionKind::Static),
            },
            Rule {
                name: "document",
                matcher: Matcher::AnyOf(vec![Matcher::Destination(vec![Destination::Document]), Matcher::AcceptsHtml]),
                route: Route { offline_fallback: true, ..Route::new(Strategy::NetworkFirst, PartitionKind::Dynamic) },
            },
            Rule {
                name: "default",
                matcher: Matcher::Always,
                route: Route::new(Strategy::NetworkFirst, PartitionKind::Dynamic),
            },
        ])
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn classify(&self, request: &Request) -> Decision {
        if request.method != Method::Get {
            return Decision::Passthrough(PassReason::Method);
        }
        if !request.is_http() {
            return Decision::Passthrough(PassReason::Scheme);
        }

        match self.rules.iter().find(|rule| rule.matcher.matches(request)) {
            Some(rule) => Decision::Route { rule: rule.name, route: rule.route },
            None => Decision::Route {
                rule: "unmatched",
                route: Route::new(Strategy::NetworkFirst, PartitionKind::Dynamic),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn router() -> Router {
        Router::from_config(&RoutingConfig::default())
    }

    fn get(path: &str) -> Request {
        Request::get(Url::parse("https://spinezone.test").unwrap().join(path).unwrap())
    }

    fn route_of(request: &Request) -> (&'static str, Route) {
        match router().classify(request) {
            Decision::Route { rule, route } => (rule, route),
            other => panic!("expected a route, got {other:?}"),
        }
    }

    #[test]
    fn test_api_is_network_first_dynamic() {
        for path in ["/api/contact", "/api/locations?zip=92101", "/api/"] {
            let (rule, route) = route_of(&get(path));
            assert_eq!(rule, "api");
            assert_eq!(route.strategy, Strategy::NetworkFirst);
            assert_eq!(route.partition, PartitionKind::Dynamic);
            assert!(!route.offline_fallback);
        }
    }

    #[test]
    fn test_api_wins_over_destination() {
        let request = get("/api/og-image").with_destination(Destination::Image);
        assert_eq!(route_of(&request).0, "api");
    }

    #[test]
    fn test_image_is_cache_first_dynamic_by_default() {
        let (rule, route) = route_of(&get("/images/clinic.jpg").with_destination(Destination::Image));
        assert_eq!(rule, "image");
        assert_eq!(route.strategy, Strategy::CacheFirst);
        assert_eq!(route.partition, PartitionKind::Dynamic);
    }

    #[test]
    fn test_image_partition_switch() {
        let config = RoutingConfig { dedicated_image_partition: true, ..Default::default() };
        let request = get("/images/clinic.jpg").with_destination(Destination::Image);
        match Router::from_config(&config).classify(&request) {
            Decision::Route { route, .. } => assert_eq!(route.partition, PartitionKind::Images),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_script_style_font_are_cache_first_static() {
        for destination in [Destination::Script, Destination::Style, Destination::Font] {
            let (rule, route) = route_of(&get("/assets/file").with_destination(destination));
            assert_eq!(rule, "static-asset");
            assert_eq!(route.strategy, Strategy::CacheFirst);
            assert_eq!(route.partition, PartitionKind::Static);
        }
    }

    #[test]
    fn test_static_marker_path() {
        let (rule, route) = route_of(&get("/_next/static/chunks/main.js"));
        assert_eq!(rule, "static-asset");
        assert_eq!(route.strategy, Strategy::CacheFirst);
        assert_eq!(route.partition, PartitionKind::Static);
    }

    #[test]
    fn test_document_by_destination_or_accept() {
        let (rule, route) = route_of(&get("/").with_destination(Destination::Document));
        assert_eq!(rule, "document");
        assert!(route.offline_fallback);

        let (rule, _) = route_of(&get("/about").with_header("Accept", "text/html,application/xhtml+xml"));
        assert_eq!(rule, "document");
    }

    #[test]
    fn test_default_rule() {
        let (rule, route) = route_of(&get("/manifest.json").with_destination(Destination::Manifest));
        assert_eq!(rule, "default");
        assert_eq!(route.strategy, Strategy::NetworkFirst);
        assert_eq!(route.partition, PartitionKind::Dynamic);
        assert!(!route.offline_fallback);
    }

    #[test]
    fn test_non_get_passes_through() {
        let request = Request::new(Method::Post, get("/api/contact").url);
        assert_eq!(router().classify(&request), Decision::Passthrough(PassReason::Method));
    }

    #[test]
    fn test_non_http_passes_through() {
        let request = Request::get(Url::parse("chrome-extension://abc/inject.js").unwrap());
        assert_eq!(router().classify(&request), Decision::Passthrough(PassReason::Scheme));
    }

    #[test]
    fn test_rule_order_is_auditable() {
        let names: Vec<_> = router().rules().iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["api", "image", "static-asset", "document", "default"]);
    }
}
