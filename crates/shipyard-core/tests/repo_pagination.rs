//! Tests for the hosting-API client's paginated listing and lookup.

mod common;

use std::sync::Arc;

use common::{response, response_with_headers, FakeFetcher};
use shipyard_core::sync::RepoHost;

fn repo_json(full_name: &str) -> String {
    format!(
        r#"{{"full_name":"{0}","clone_url":"https://host.example.com/{0}.git"}}"#,
        full_name
    )
}

#[tokio::test]
async fn listing_follows_the_next_link_chain() {
    let fetcher = Arc::new(FakeFetcher::new(|url, _headers| {
        Ok(match url {
            "https://api.test/orgs/acme/repos" => response_with_headers(
                200,
                &format!("[{}]", repo_json("acme/one")),
                &[("link", "<https://api.test/orgs/acme/repos?page=2>; rel=\"next\"")],
            ),
            "https://api.test/orgs/acme/repos?page=2" => response_with_headers(
                200,
                &format!("[{}]", repo_json("acme/two")),
                &[("link", "<https://api.test/orgs/acme/repos?page=3>; rel=\"next\"")],
            ),
            "https://api.test/orgs/acme/repos?page=3" => response_with_headers(
                200,
                &format!("[{}]", repo_json("acme/three")),
                &[("link", "<https://api.test/orgs/acme/repos?page=4>; rel=\"next\"")],
            ),
            "https://api.test/orgs/acme/repos?page=4" => {
                response(200, &format!("[{}]", repo_json("acme/four")))
            }
            other => anyhow::bail!("unexpected url {}", other),
        })
    }));

    let host = RepoHost::new(fetcher.clone(), None).with_base_url("https://api.test");
    let repos = host.list_repos("acme").await.unwrap();

    assert_eq!(fetcher.requested_urls().len(), 4);
    let names: Vec<_> = repos.iter().map(|r| r.full_name.as_str()).collect();
    assert_eq!(names, vec!["acme/one", "acme/two", "acme/three", "acme/four"]);
}

#[tokio::test]
async fn single_page_listing_issues_one_request() {
    let fetcher = Arc::new(FakeFetcher::new(|_url, _headers| {
        Ok(response(200, &format!("[{}]", repo_json("acme/solo"))))
    }));

    let host = RepoHost::new(fetcher.clone(), None).with_base_url("https://api.test");
    let repos = host.list_repos("acme").await.unwrap();

    assert_eq!(fetcher.requested_urls().len(), 1);
    assert_eq!(repos.len(), 1);
}

#[tokio::test]
async fn lookup_treats_404_as_gone() {
    let fetcher = Arc::new(FakeFetcher::new(|url, _headers| {
        Ok(if url.ends_with("acme/kept") {
            response(200, &repo_json("acme/kept"))
        } else {
            response(404, r#"{"message":"Not Found"}"#)
        })
    }));

    let host = RepoHost::new(fetcher, None).with_base_url("https://api.test");
    assert!(host.lookup("acme/kept").await.unwrap().is_some());
    assert!(host.lookup("acme/gone").await.unwrap().is_none());
}

#[tokio::test]
async fn unexpected_listing_status_is_a_protocol_error() {
    let fetcher = Arc::new(FakeFetcher::new(|_url, _headers| {
        Ok(response(500, "internal error"))
    }));

    let host = RepoHost::new(fetcher, None).with_base_url("https://api.test");
    let err = host.list_repos("acme").await.unwrap_err();
    assert!(err.to_string().contains("repository listing"));
}
