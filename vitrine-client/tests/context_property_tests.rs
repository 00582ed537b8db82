//! Property-Based Tests for Tenant Resolution
//!
//! **Latest navigation wins:** for any sequence of navigations with
//! arbitrary fetch latencies, the settled state names the tenant of the
//! last navigation, and the document carries that tenant's theme.
//!
//! **Total resolution:** every path settles READY on some tenant as long
//! as the default tenant loads.

use std::time::Duration;

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use tokio::runtime::{Builder, Runtime};
use vitrine_client::Phase;
use vitrine_test_utils::generators::{arb_path, arb_slug};
use vitrine_test_utils::{slug, tenant_fixture, ScriptedFetcher};

#[path = "support/harness.rs"]
mod test_harness;
use test_harness::{harness, routes};

// ============================================================================
// TEST CONFIGURATION
// ============================================================================

fn paused_runtime() -> Result<Runtime, TestCaseError> {
    Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .map_err(|e| TestCaseError::fail(format!("Failed to create runtime: {}", e)))
}

fn arb_navigations() -> impl Strategy<Value = Vec<(vitrine_core::Slug, u64)>> {
    prop::collection::vec((arb_slug(), 0u64..3_000), 1..6)
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_latest_navigation_wins(navigations in arb_navigations()) {
        let rt = paused_runtime()?;
        let fetcher = ScriptedFetcher::with_tenants(
            navigations.iter().map(|(s, _)| tenant_fixture(s.as_str())),
        );
        for (s, delay_ms) in &navigations {
            fetcher.delay(s, Duration::from_millis(*delay_ms));
        }
        let h = harness(fetcher);
        let last = navigations.last().map(|(s, _)| s.clone()).unwrap();

        rt.block_on(async {
            let mut handles = Vec::new();
            for (s, _) in &navigations {
                let context = h.context.clone();
                let path = format!("/t/{}", s);
                handles.push(tokio::spawn(async move { context.navigate(&path, None).await }));
                // Start each navigation before the next one.
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            for handle in handles {
                handle.await.map_err(|e| TestCaseError::fail(e.to_string()))?;
            }
            Ok::<_, TestCaseError>(())
        })?;

        let state = h.context.snapshot();
        prop_assert_eq!(state.phase(), Phase::Ready);
        prop_assert_eq!(state.active_slug.as_ref(), Some(&last));
        let tenant = state.tenant.clone().unwrap();
        prop_assert_eq!(&tenant.slug, &last);
        let doc = h.document.snapshot();
        prop_assert_eq!(doc.title, Some(format!("Tenant {}", last)));
    }

    #[test]
    fn prop_any_path_settles_ready(path in arb_path()) {
        let rt = paused_runtime()?;
        let h = harness(ScriptedFetcher::with_tenants([tenant_fixture("main")]));

        let state = rt.block_on(h.context.navigate(&path, None));

        prop_assert_eq!(state.phase(), Phase::Ready);
        prop_assert_eq!(state.active_slug.clone(), Some(routes().resolve_slug(&path)));
        let tenant = state.tenant.clone().unwrap();
        prop_assert_eq!(&tenant.slug, &slug("main"));
    }

    #[test]
    fn prop_prefixed_slug_is_requested(s in arb_slug(), rest in arb_path()) {
        let rt = paused_runtime()?;
        let h = harness(ScriptedFetcher::with_tenants([
            tenant_fixture("main"),
            tenant_fixture(s.as_str()),
        ]));
        let path = format!("/t/{}{}", s, rest);

        let state = rt.block_on(h.context.navigate(&path, None));

        prop_assert_eq!(state.active_slug.as_ref(), Some(&s));
        let tenant = state.tenant.clone().unwrap();
        prop_assert_eq!(&tenant.slug, &s);
    }
}
