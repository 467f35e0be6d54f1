use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, TimeZone, Utc};
use httpmock::prelude::*;
use serde_json::json;
use vigil_gitlab::{GitlabApiClient, GitlabConfig};
use vigil_maintainers::{
    ActivityError, MaintainerActivityConfig, MaintainerActivityHandler, SignalStep, StepStatus,
};

fn cutoff() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0)
        .single()
        .expect("valid cutoff")
}

fn handler_for(server: &MockServer, project: &str) -> MaintainerActivityHandler {
    let client = GitlabApiClient::new(GitlabConfig {
        api_base: format!("{}/api/v4", server.base_url()),
        token: "integration-token".to_string(),
        request_timeout_ms: 5_000,
        retry_max_attempts: 2,
        retry_base_delay_ms: 1,
    })
    .expect("gitlab client should be created");
    MaintainerActivityHandler::new(
        Arc::new(client),
        project,
        MaintainerActivityConfig::new(cutoff()).with_page_size(2),
    )
}

fn mock_empty<'a>(server: &'a MockServer, path: &str) -> httpmock::Mock<'a> {
    let path = format!("/api/v4/projects/7/{path}");
    server.mock(move |when, then| {
        when.method(GET).path(path.as_str());
        then.status(200).header("x-next-page", "").json_body(json!([]));
    })
}

fn mock_members(server: &MockServer) -> httpmock::Mock<'_> {
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/v4/projects/7/members/all")
            .header("private-token", "integration-token")
            .query_param("per_page", "2");
        then.status(200).header("x-next-page", "").json_body(json!([
            {"id": 1, "username": "Alice", "access_level": 40},
            {"id": 2, "username": "bob", "access_level": 30},
            {"id": 3, "username": "guest", "access_level": 10}
        ]));
    })
}

#[tokio::test]
async fn integration_handler_resolves_project_path_and_stops_after_release_authors() {
    let server = MockServer::start();
    let lookup = server.mock(|when, then| {
        when.method(GET).path("/api/v4/projects/tooling");
        then.status(200).json_body(json!({"id": 7, "path": "tooling"}));
    });
    let members = mock_members(&server);
    let merge_requests_page_one = server.mock(|when, then| {
        when.method(GET)
            .path("/api/v4/projects/7/merge_requests")
            .query_param("page", "1")
            .query_param("updated_after", "2026-04-01T00:00:00Z");
        then.status(200).json_body(json!([
            {"iid": 1, "merged_at": "2026-05-01T10:00:00Z", "merged_by": {"username": "alice"}},
            {"iid": 2, "merged_at": null, "merged_by": null}
        ]));
    });
    let merge_requests_page_two = server.mock(|when, then| {
        when.method(GET)
            .path("/api/v4/projects/7/merge_requests")
            .query_param("page", "2");
        then.status(200).json_body(json!([
            {"iid": 3, "merged_at": "2026-03-01T10:00:00Z", "merged_by": {"username": "bob"}}
        ]));
    });
    let releases = server.mock(|when, then| {
        when.method(GET)
            .path("/api/v4/projects/7/releases")
            .query_param("order_by", "released_at");
        then.status(200).header("x-next-page", "").json_body(json!([
            {"tag_name": "v2.0.0", "author": {"username": "bob"}, "released_at": "2026-06-01T00:00:00Z"}
        ]));
    });
    let snippets = mock_empty(&server, "snippets");

    let handler = handler_for(&server, "tooling");
    let report = handler.report().await.expect("setup should succeed");

    lookup.assert_hits(1);
    members.assert_hits(1);
    merge_requests_page_one.assert_hits(1);
    merge_requests_page_two.assert_hits(1);
    releases.assert_hits(1);
    snippets.assert_hits(0);
    assert_eq!(
        report.activity,
        [("alice".to_string(), true), ("bob".to_string(), true)]
            .into_iter()
            .collect::<BTreeMap<_, _>>()
    );
    assert_eq!(
        report.evidence.get("bob").map(|evidence| evidence.step),
        Some(SignalStep::ReleaseAuthors)
    );
    assert!(report.early_terminated);
}

#[tokio::test]
async fn integration_best_effort_audit_denial_falls_through_to_pipeline_schedules() {
    let server = MockServer::start();
    let members = mock_members(&server);
    let _merge_requests = mock_empty(&server, "merge_requests");
    let _releases = mock_empty(&server, "releases");
    let _snippets = mock_empty(&server, "snippets");
    let audit = server.mock(|when, then| {
        when.method(GET).path("/api/v4/projects/7/audit_events");
        then.status(403).body("{\"message\":\"403 Forbidden\"}");
    });
    let _pipelines = mock_empty(&server, "pipelines");
    let schedules = server.mock(|when, then| {
        when.method(GET).path("/api/v4/projects/7/pipeline_schedules");
        then.status(200).header("x-next-page", "").json_body(json!([
            {"id": 1, "owner": {"username": "alice"}, "updated_at": "2026-04-02T00:00:00Z"},
            {"id": 2, "owner": {"username": "bob"}, "created_at": "2026-04-03T00:00:00Z"}
        ]));
    });

    let handler = handler_for(&server, "7");
    let activity = handler
        .maintainer_activity()
        .await
        .expect("audit denial is not fatal");

    members.assert_hits(1);
    audit.assert_hits(1);
    schedules.assert_hits(1);
    assert_eq!(activity.get("alice"), Some(&true));
    assert_eq!(activity.get("bob"), Some(&true));
    assert!(!activity.contains_key("guest"));

    let report = handler.report().await.expect("cached report");
    let audit_step = report
        .steps
        .iter()
        .find(|outcome| outcome.step == SignalStep::AuditEvents)
        .expect("audit step should be recorded");
    assert!(matches!(audit_step.status, StepStatus::Failed { .. }));
    assert_eq!(handler.setup_runs(), 1);
}

#[tokio::test]
async fn integration_primary_signal_failure_surfaces_collect_activity_error() {
    let server = MockServer::start();
    let _members = mock_members(&server);
    let merge_requests = server.mock(|when, then| {
        when.method(GET).path("/api/v4/projects/7/merge_requests");
        then.status(401).body("{\"message\":\"401 Unauthorized\"}");
    });

    let handler = handler_for(&server, "7");
    let error = handler
        .maintainer_activity()
        .await
        .expect_err("merge request failure is fatal");

    merge_requests.assert_hits(1);
    assert!(matches!(
        error,
        ActivityError::CollectActivity {
            step: SignalStep::MergeRequestMerges,
            ..
        }
    ));
    assert_eq!(error.source_error().status(), Some(401));
    assert!(error.to_string().contains("collect activity (merge_request_merges)"));
}
