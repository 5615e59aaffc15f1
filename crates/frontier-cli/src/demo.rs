use std::time::Duration;

use frontier_crawler::CannedFetcher;

pub const DEMO_SEED: &str = "http://golang.org/";

/// A handful of golang.org pages, `http://golang.org/cmd/` is deliberately missing.
pub fn golang_site() -> CannedFetcher {
    CannedFetcher::new()
        .latency(Duration::from_millis(300))
        .page(
            "http://golang.org/",
            "The Go Programming Language",
            ["http://golang.org/pkg/", "http://golang.org/cmd/"],
        )
        .page(
            "http://golang.org/pkg/",
            "Packages",
            [
                "http://golang.org/",
                "http://golang.org/cmd/",
                "http://golang.org/pkg/fmt/",
                "http://golang.org/pkg/os/",
            ],
        )
        .page(
            "http://golang.org/pkg/fmt/",
            "Package fmt",
            ["http://golang.org/", "http://golang.org/pkg/"],
        )
        .page(
            "http://golang.org/pkg/os/",
            "Package os",
            ["http://golang.org/", "http://golang.org/pkg/"],
        )
}
