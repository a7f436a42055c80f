//! Blue/green controller — drives the deployment state machine.
//!
//! One controller instance orchestrates all applications: it owns the
//! per-app serialization guard and ties the registry, traffic router,
//! readiness board, and provisioner together. Transitions return once
//! the registry flip and traffic-routing change are accepted; replica
//! convergence is observed separately via [`BlueGreenController::status`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{info, warn};

use shipyard_probe::ReadinessBoard;
use shipyard_state::{AppRecord, Color, RegistryStore, app_key, epoch_secs};
use shipyard_traffic::{Selector, TrafficRouter};

use crate::error::{BlueGreenError, BlueGreenResult};
use crate::machine::{InFlightOp, LifecycleState, derive_state};
use crate::provision::Provisioner;
use crate::spec::PrepareSpec;

/// Handle returned by Prepare. Readiness is observed asynchronously via
/// the status listing, not by blocking on this handle.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewHandle {
    pub namespace: String,
    pub name: String,
    /// The color the preview was provisioned on.
    pub color: Color,
    /// Address the preview listens on (probed for readiness).
    pub address: String,
    pub created_at: u64,
}

/// One row of the status listing polled by dashboards.
#[derive(Debug, Clone, Serialize)]
pub struct AppStatus {
    pub namespace: String,
    pub name: String,
    /// `image:tag` of the stable version.
    pub image: String,
    /// Requested replica count for stable.
    pub desired: u32,
    /// Replicas that currently exist (may lag `desired` during rollout).
    pub current: u32,
    /// Replicas passing health checks.
    pub available: u32,
    /// Replicas running the latest descriptor.
    pub updated: u32,
    /// Infrastructure conditions, free-form.
    pub conditions: HashMap<String, String>,
    /// `null` when no preview exists, else the latest probe verdict.
    pub preview_ready: Option<bool>,
    /// Derived lifecycle state.
    pub state: LifecycleState,
}

type InFlightMap = Arc<Mutex<HashMap<String, InFlightOp>>>;

/// RAII guard over one application's in-flight slot.
struct OpToken {
    key: String,
    ops: InFlightMap,
}

impl Drop for OpToken {
    fn drop(&mut self) {
        self.ops.lock().expect("in-flight lock").remove(&self.key);
    }
}

/// Orchestrates Prepare/Promote/Rollback across all applications.
#[derive(Clone)]
pub struct BlueGreenController {
    store: RegistryStore,
    router: TrafficRouter,
    board: ReadinessBoard,
    provisioner: Arc<dyn Provisioner>,
    in_flight: InFlightMap,
}

impl BlueGreenController {
    pub fn new(
        store: RegistryStore,
        router: TrafficRouter,
        board: ReadinessBoard,
        provisioner: Arc<dyn Provisioner>,
    ) -> Self {
        Self {
            store,
            router,
            board,
            provisioner,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Claim the transition guard for an app, or fail with a conflict.
    ///
    /// Transitions are serialized per `(namespace, name)`: a concurrent
    /// request is rejected rather than queued, so traffic-switch
    /// operations never interleave ambiguously.
    fn begin(&self, key: &str, op: InFlightOp) -> BlueGreenResult<OpToken> {
        let mut ops = self.in_flight.lock().expect("in-flight lock");
        if let Some(existing) = ops.get(key) {
            return Err(BlueGreenError::Conflict(format!(
                "{} already in flight for {key}",
                existing.as_str()
            )));
        }
        ops.insert(key.to_string(), op);
        Ok(OpToken {
            key: key.to_string(),
            ops: Arc::clone(&self.in_flight),
        })
    }

    fn in_flight_for(&self, key: &str) -> Option<InFlightOp> {
        self.in_flight.lock().expect("in-flight lock").get(key).copied()
    }

    // ── Deploy ─────────────────────────────────────────────────────

    /// First-deploy or re-deploy of an application's stable version.
    ///
    /// Creates the registry record on first deploy and routes production
    /// traffic to it; subsequent deploys update `stable` in place.
    pub fn deploy(&self, namespace: &str, spec: &PrepareSpec) -> BlueGreenResult<AppRecord> {
        spec.validate()?;
        let key = app_key(namespace, &spec.name);
        let _token = self.begin(&key, InFlightOp::Updating)?;

        let now = epoch_secs();
        let record = match self.store.get_app(&key)? {
            Some(mut record) => {
                let version = spec.version();
                self.provisioner
                    .apply(namespace, &spec.name, &version, record.active_color)
                    .map_err(|e| BlueGreenError::Provision(e.to_string()))?;
                record.stable = version;
                record.updated_at = now;
                self.store.put_app(&record)?;
                record
            }
            None => {
                let version = spec.version();
                let color = Color::Blue;
                self.provisioner
                    .apply(namespace, &spec.name, &version, color)
                    .map_err(|e| BlueGreenError::Provision(e.to_string()))?;
                let record = AppRecord {
                    namespace: namespace.to_string(),
                    name: spec.name.clone(),
                    stable: version,
                    preview: None,
                    previous_stable: None,
                    active_color: color,
                    created_at: now,
                    updated_at: now,
                };
                self.store.put_app(&record)?;
                record
            }
        };

        self.router.set_route(
            &key,
            Selector::for_color(&record.name, record.active_color, record.stable.port),
        );
        info!(app = %key, image = %record.stable.image_ref(), "application deployed");
        Ok(record)
    }

    // ── Prepare ────────────────────────────────────────────────────

    /// Provision an isolated preview of a new version.
    ///
    /// Replaces any in-flight preview (the superseded preview's workload
    /// is torn down first, so nothing leaks). Does not block until
    /// ready: readiness is observed asynchronously via `status`.
    pub fn prepare(&self, namespace: &str, spec: &PrepareSpec) -> BlueGreenResult<PreviewHandle> {
        spec.validate()?;
        let key = app_key(namespace, &spec.name);
        let _token = self.begin(&key, InFlightOp::Preparing)?;

        let mut record = self.store.get_app(&key)?.ok_or_else(|| {
            BlueGreenError::NotFound(format!("application {key} not found; deploy it first"))
        })?;

        let color = record.preview_color();

        // Replace semantics: tear the superseded preview down first.
        if record.preview.is_some() {
            self.provisioner
                .remove(namespace, &spec.name, color)
                .map_err(|e| BlueGreenError::Provision(e.to_string()))?;
            self.board.clear(&key);
        }

        let version = spec.version();
        let address = self
            .provisioner
            .apply(namespace, &spec.name, &version, color)
            .map_err(|e| BlueGreenError::Provision(e.to_string()))?;

        record.preview = Some(version);
        record.updated_at = epoch_secs();
        self.store.put_app(&record)?;
        // Fresh preview: verdict unknown until a probe concludes.
        self.board.clear(&key);

        info!(
            app = %key,
            color = color.as_str(),
            image = %format!("{}:{}", spec.image, spec.tag),
            "preview prepared"
        );
        Ok(PreviewHandle {
            namespace: namespace.to_string(),
            name: spec.name.clone(),
            color,
            address,
            created_at: record.updated_at,
        })
    }

    // ── Promote ────────────────────────────────────────────────────

    /// Atomically cut production traffic over to the prepared preview.
    ///
    /// Legal only while the preview's readiness probe is passing — the
    /// core safety guarantee. The registry record flips in a single
    /// transaction; the displaced stable is retained as the rollback
    /// target rather than torn down.
    pub fn promote(&self, namespace: &str, name: &str) -> BlueGreenResult<()> {
        let key = app_key(namespace, name);
        let _token = self.begin(&key, InFlightOp::Promoting)?;

        let mut record = self
            .store
            .get_app(&key)?
            .ok_or_else(|| BlueGreenError::NotFound(format!("application {key} not found")))?;

        let preview = match record.preview.take() {
            Some(p) => p,
            None => {
                return Err(BlueGreenError::Conflict(format!(
                    "no preview prepared for {key}"
                )));
            }
        };

        match self.board.get(&key) {
            Some(true) => {}
            Some(false) => {
                return Err(BlueGreenError::NotReady(format!(
                    "preview for {key} is failing its readiness probe"
                )));
            }
            None => {
                return Err(BlueGreenError::NotReady(format!(
                    "preview readiness for {key} is unknown; refusing to promote"
                )));
            }
        }

        if preview == record.stable {
            warn!(app = %key, "promoting a preview identical to current stable");
        }

        let new_color = record.preview_color();
        record.previous_stable = Some(std::mem::replace(&mut record.stable, preview));
        record.active_color = new_color;
        record.updated_at = epoch_secs();
        self.store.put_app(&record)?;

        self.router.set_route(
            &key,
            Selector::for_color(name, new_color, record.stable.port),
        );
        self.board.clear(&key);

        info!(
            app = %key,
            color = new_color.as_str(),
            image = %record.stable.image_ref(),
            "promoted to production"
        );
        Ok(())
    }

    // ── Rollback ───────────────────────────────────────────────────

    /// Atomically restore the previous stable version.
    ///
    /// One level deep by design: the restored record has no
    /// `previous_stable`, so a rollback cannot itself be rolled back.
    /// Any preview prepared since the promote is discarded.
    pub fn rollback(&self, namespace: &str, name: &str) -> BlueGreenResult<()> {
        let key = app_key(namespace, name);
        let _token = self.begin(&key, InFlightOp::RollingBack)?;

        let mut record = self
            .store
            .get_app(&key)?
            .ok_or_else(|| BlueGreenError::NotFound(format!("application {key} not found")))?;

        let previous = match record.previous_stable.take() {
            Some(p) => p,
            None => {
                return Err(BlueGreenError::NotFound(format!(
                    "nothing to roll back to for {key}"
                )));
            }
        };

        let demoted_color = record.active_color;
        let restore_color = demoted_color.other();

        // Re-apply the rollback target before flipping: a later Prepare
        // may have reused its color, and a failure here must leave the
        // registry unchanged.
        self.provisioner
            .apply(namespace, name, &previous, restore_color)
            .map_err(|e| BlueGreenError::Provision(e.to_string()))?;

        record.stable = previous;
        record.previous_stable = None;
        record.preview = None;
        record.active_color = restore_color;
        record.updated_at = epoch_secs();
        self.store.put_app(&record)?;

        self.router.set_route(
            &key,
            Selector::for_color(name, restore_color, record.stable.port),
        );
        self.board.clear(&key);

        // Cleanup of the demoted version is best-effort; traffic has
        // already moved off it.
        if let Err(e) = self.provisioner.remove(namespace, name, demoted_color) {
            warn!(app = %key, error = %e, "failed to tear down demoted version");
        }

        info!(
            app = %key,
            color = restore_color.as_str(),
            image = %record.stable.image_ref(),
            "rolled back to previous stable"
        );
        Ok(())
    }

    // ── Scale ──────────────────────────────────────────────────────

    /// Change the stable version's requested replica count.
    pub fn scale(&self, namespace: &str, name: &str, replicas: u32) -> BlueGreenResult<AppRecord> {
        if replicas == 0 {
            return Err(BlueGreenError::Validation("replicas must be >= 1".into()));
        }
        let key = app_key(namespace, name);
        let _token = self.begin(&key, InFlightOp::Updating)?;

        let mut record = self
            .store
            .get_app(&key)?
            .ok_or_else(|| BlueGreenError::NotFound(format!("application {key} not found")))?;

        record.stable.replicas = replicas;
        self.provisioner
            .apply(namespace, name, &record.stable, record.active_color)
            .map_err(|e| BlueGreenError::Provision(e.to_string()))?;
        record.updated_at = epoch_secs();
        self.store.put_app(&record)?;

        info!(app = %key, replicas, "application scaled");
        Ok(record)
    }

    // ── Delete ─────────────────────────────────────────────────────

    /// Destroy an application: stable, any lingering preview, routes,
    /// probes, and registry rows.
    pub fn delete(&self, namespace: &str, name: &str) -> BlueGreenResult<()> {
        let key = app_key(namespace, name);
        let _token = self.begin(&key, InFlightOp::Updating)?;

        let record = self
            .store
            .get_app(&key)?
            .ok_or_else(|| BlueGreenError::NotFound(format!("application {key} not found")))?;

        for color in [record.active_color, record.active_color.other()] {
            self.provisioner
                .remove(namespace, name, color)
                .map_err(|e| BlueGreenError::Provision(e.to_string()))?;
        }

        self.store.delete_app(&key)?;
        self.store.delete_replicas(namespace, name)?;
        self.router.remove_route(&key);
        self.board.clear(&key);

        info!(app = %key, "application deleted");
        Ok(())
    }

    // ── Status ─────────────────────────────────────────────────────

    /// Read-only, side-effect-free status listing for one namespace.
    ///
    /// Unserialized: reads race freely with in-flight transitions and
    /// observe either the pre- or post-transition record, never a mix.
    pub fn status(&self, namespace: &str) -> BlueGreenResult<Vec<AppStatus>> {
        let mut items = Vec::new();
        for record in self.store.list_apps(namespace)? {
            let key = record.table_key();
            let snapshot =
                self.store
                    .get_replicas(namespace, &record.name, record.active_color)?;
            let preview_ready = if record.preview.is_some() {
                self.board.get(&key)
            } else {
                None
            };
            let state = derive_state(&record, preview_ready, self.in_flight_for(&key));

            let (current, available, updated, conditions) = match snapshot {
                Some(s) => (s.current, s.available, s.updated, s.conditions),
                None => (0, 0, 0, HashMap::new()),
            };

            items.push(AppStatus {
                namespace: record.namespace.clone(),
                name: record.name.clone(),
                image: record.stable.image_ref(),
                desired: record.stable.replicas,
                current,
                available,
                updated,
                conditions,
                preview_ready,
                state,
            });
        }
        Ok(items)
    }

    /// The registry record for one application, if it exists.
    pub fn get_app(&self, namespace: &str, name: &str) -> BlueGreenResult<Option<AppRecord>> {
        Ok(self.store.get_app(&app_key(namespace, name))?)
    }

    /// The readiness board transitions are gated on.
    pub fn board(&self) -> &ReadinessBoard {
        &self.board
    }

    /// Every registered application, across all namespaces. Used at
    /// startup to rebuild traffic routes.
    pub fn all_apps(&self) -> BlueGreenResult<Vec<AppRecord>> {
        Ok(self.store.list_all_apps()?)
    }

    /// Applications with a prepared preview, across all namespaces.
    /// Used at startup to resume readiness probing.
    pub fn apps_with_previews(&self) -> BlueGreenResult<Vec<AppRecord>> {
        Ok(self
            .store
            .list_all_apps()?
            .into_iter()
            .filter(|r| r.preview.is_some())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provision::{LocalProvisioner, ProvisionError};
    use shipyard_state::VersionSpec;

    fn spec(name: &str, tag: &str) -> PrepareSpec {
        PrepareSpec {
            name: name.to_string(),
            image: "org/api".to_string(),
            tag: tag.to_string(),
            port: 8080,
            health_path: "/healthz".to_string(),
            readiness_path: "/ready".to_string(),
            metrics_path: "/metrics".to_string(),
            replicas: 2,
            env: vec![],
        }
    }

    fn controller() -> BlueGreenController {
        let store = RegistryStore::open_in_memory().unwrap();
        let provisioner = Arc::new(LocalProvisioner::new(store.clone()));
        BlueGreenController::new(
            store,
            TrafficRouter::new(),
            ReadinessBoard::new(),
            provisioner,
        )
    }

    /// Deploy v1 and prepare v2, leaving the preview pending.
    fn with_pending_preview(ctl: &BlueGreenController) {
        ctl.deploy("acme", &spec("api", "v1")).unwrap();
        ctl.prepare("acme", &spec("api", "v2")).unwrap();
    }

    /// Deploy v1 and prepare v2 with a passing readiness probe.
    fn with_ready_preview(ctl: &BlueGreenController) {
        with_pending_preview(ctl);
        ctl.board.set("acme/api", true);
    }

    struct FailingProvisioner;

    impl Provisioner for FailingProvisioner {
        fn apply(
            &self,
            _namespace: &str,
            _name: &str,
            _spec: &VersionSpec,
            _color: Color,
        ) -> Result<String, ProvisionError> {
            Err(ProvisionError("quota exceeded".to_string()))
        }

        fn remove(
            &self,
            _namespace: &str,
            _name: &str,
            _color: Color,
        ) -> Result<(), ProvisionError> {
            Err(ProvisionError("api server unreachable".to_string()))
        }
    }

    // ── Deploy ─────────────────────────────────────────────────────

    #[test]
    fn deploy_creates_record_and_route() {
        let ctl = controller();
        let record = ctl.deploy("acme", &spec("api", "v1")).unwrap();

        assert_eq!(record.stable.tag, "v1");
        assert_eq!(record.active_color, Color::Blue);
        assert!(record.preview.is_none());

        let selector = ctl.router.route("acme/api").unwrap();
        assert_eq!(selector.color(), Some("blue"));
    }

    #[test]
    fn deploy_existing_updates_stable_in_place() {
        let ctl = controller();
        ctl.deploy("acme", &spec("api", "v1")).unwrap();
        let record = ctl.deploy("acme", &spec("api", "v1.1")).unwrap();

        assert_eq!(record.stable.tag, "v1.1");
        assert_eq!(record.active_color, Color::Blue);
    }

    #[test]
    fn deploy_rejects_invalid_name() {
        let ctl = controller();
        let err = ctl.deploy("acme", &spec("Bad_Name", "v1")).unwrap_err();
        assert!(matches!(err, BlueGreenError::Validation(_)));
        assert!(ctl.get_app("acme", "Bad_Name").unwrap().is_none());
    }

    // ── Prepare ────────────────────────────────────────────────────

    #[test]
    fn prepare_rejects_invalid_name_without_state() {
        let ctl = controller();
        let err = ctl.prepare("acme", &spec("-api", "v2")).unwrap_err();
        assert!(matches!(err, BlueGreenError::Validation(_)));
        assert!(ctl.get_app("acme", "-api").unwrap().is_none());
    }

    #[test]
    fn prepare_requires_deployed_app() {
        let ctl = controller();
        let err = ctl.prepare("acme", &spec("api", "v2")).unwrap_err();
        assert!(matches!(err, BlueGreenError::NotFound(_)));
    }

    #[test]
    fn prepare_creates_preview_on_inactive_color() {
        let ctl = controller();
        ctl.deploy("acme", &spec("api", "v1")).unwrap();
        let handle = ctl.prepare("acme", &spec("api", "v2")).unwrap();

        assert_eq!(handle.color, Color::Green);
        assert_eq!(handle.address, "127.0.0.1:8080");

        let record = ctl.get_app("acme", "api").unwrap().unwrap();
        assert_eq!(record.preview.unwrap().tag, "v2");
        assert_eq!(record.stable.tag, "v1");
        // Production traffic untouched.
        assert_eq!(ctl.router.route("acme/api").unwrap().color(), Some("blue"));
    }

    #[test]
    fn prepare_again_replaces_preview() {
        let ctl = controller();
        with_ready_preview(&ctl);

        ctl.prepare("acme", &spec("api", "v3")).unwrap();

        let record = ctl.get_app("acme", "api").unwrap().unwrap();
        assert_eq!(record.preview.unwrap().tag, "v3");
        // Replacement resets the readiness verdict.
        assert_eq!(ctl.board.get("acme/api"), None);
    }

    #[test]
    fn prepare_provision_failure_leaves_registry_unchanged() {
        let store = RegistryStore::open_in_memory().unwrap();
        let good = Arc::new(LocalProvisioner::new(store.clone()));
        let ctl = BlueGreenController::new(
            store.clone(),
            TrafficRouter::new(),
            ReadinessBoard::new(),
            good,
        );
        ctl.deploy("acme", &spec("api", "v1")).unwrap();

        let failing = BlueGreenController::new(
            store,
            ctl.router.clone(),
            ctl.board.clone(),
            Arc::new(FailingProvisioner),
        );
        let err = failing.prepare("acme", &spec("api", "v2")).unwrap_err();
        assert!(matches!(err, BlueGreenError::Provision(_)));

        let record = ctl.get_app("acme", "api").unwrap().unwrap();
        assert!(record.preview.is_none());
        assert_eq!(record.stable.tag, "v1");
    }

    #[test]
    fn prepare_while_promote_in_flight_conflicts() {
        let ctl = controller();
        with_ready_preview(&ctl);

        let _guard = ctl.begin("acme/api", InFlightOp::Promoting).unwrap();
        let err = ctl.prepare("acme", &spec("api", "v3")).unwrap_err();
        assert!(matches!(err, BlueGreenError::Conflict(_)));
    }

    // ── Promote ────────────────────────────────────────────────────

    #[test]
    fn promote_missing_app_is_not_found() {
        let ctl = controller();
        let err = ctl.promote("acme", "api").unwrap_err();
        assert!(matches!(err, BlueGreenError::NotFound(_)));
    }

    #[test]
    fn promote_without_preview_conflicts() {
        let ctl = controller();
        ctl.deploy("acme", &spec("api", "v1")).unwrap();
        let err = ctl.promote("acme", "api").unwrap_err();
        assert!(matches!(err, BlueGreenError::Conflict(_)));
    }

    #[test]
    fn promote_with_unknown_readiness_is_not_ready() {
        let ctl = controller();
        with_pending_preview(&ctl);

        let err = ctl.promote("acme", "api").unwrap_err();
        assert!(matches!(err, BlueGreenError::NotReady(_)));

        // Registry untouched by the refused promote.
        let record = ctl.get_app("acme", "api").unwrap().unwrap();
        assert_eq!(record.stable.tag, "v1");
        assert_eq!(record.preview.unwrap().tag, "v2");
        assert!(record.previous_stable.is_none());
    }

    #[test]
    fn promote_with_failing_readiness_is_not_ready() {
        let ctl = controller();
        with_pending_preview(&ctl);
        ctl.board.set("acme/api", false);

        let err = ctl.promote("acme", "api").unwrap_err();
        assert!(matches!(err, BlueGreenError::NotReady(_)));
    }

    #[test]
    fn promote_flips_record_atomically() {
        let ctl = controller();
        with_ready_preview(&ctl);

        ctl.promote("acme", "api").unwrap();

        let record = ctl.get_app("acme", "api").unwrap().unwrap();
        assert_eq!(record.stable.tag, "v2");
        assert_eq!(record.previous_stable.unwrap().tag, "v1");
        assert!(record.preview.is_none());
        assert_eq!(record.active_color, Color::Green);

        // Traffic now routes to the promoted color.
        assert_eq!(ctl.router.route("acme/api").unwrap().color(), Some("green"));
        // Verdict consumed with the preview.
        assert_eq!(ctl.board.get("acme/api"), None);
    }

    #[test]
    fn concurrent_promotes_exactly_one_wins() {
        let ctl = controller();
        with_ready_preview(&ctl);

        let a = ctl.clone();
        let b = ctl.clone();
        let (ra, rb) = std::thread::scope(|s| {
            let ha = s.spawn(move || a.promote("acme", "api"));
            let hb = s.spawn(move || b.promote("acme", "api"));
            (ha.join().unwrap(), hb.join().unwrap())
        });

        let successes = [&ra, &rb].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        let loser = if ra.is_ok() { rb } else { ra };
        assert!(matches!(
            loser.unwrap_err(),
            BlueGreenError::Conflict(_)
        ));

        // Final state matches the winner's transition.
        let record = ctl.get_app("acme", "api").unwrap().unwrap();
        assert_eq!(record.stable.tag, "v2");
        assert_eq!(record.previous_stable.unwrap().tag, "v1");
    }

    // ── Rollback ───────────────────────────────────────────────────

    #[test]
    fn rollback_without_previous_is_not_found() {
        let ctl = controller();
        ctl.deploy("acme", &spec("api", "v1")).unwrap();
        let err = ctl.rollback("acme", "api").unwrap_err();
        assert!(matches!(err, BlueGreenError::NotFound(_)));
    }

    #[test]
    fn rollback_restores_previous_stable() {
        let ctl = controller();
        with_ready_preview(&ctl);
        ctl.promote("acme", "api").unwrap();

        ctl.rollback("acme", "api").unwrap();

        let record = ctl.get_app("acme", "api").unwrap().unwrap();
        assert_eq!(record.stable.tag, "v1");
        assert!(record.previous_stable.is_none());
        assert_eq!(record.active_color, Color::Blue);
        assert_eq!(ctl.router.route("acme/api").unwrap().color(), Some("blue"));
    }

    #[test]
    fn rollback_is_one_level_deep() {
        let ctl = controller();
        with_ready_preview(&ctl);
        ctl.promote("acme", "api").unwrap();
        ctl.rollback("acme", "api").unwrap();

        // The rollback consumed the only target.
        let err = ctl.rollback("acme", "api").unwrap_err();
        assert!(matches!(err, BlueGreenError::NotFound(_)));
    }

    #[test]
    fn rollback_discards_prepared_preview() {
        let ctl = controller();
        with_ready_preview(&ctl);
        ctl.promote("acme", "api").unwrap();

        // Prepare v3 after the promote, then roll back.
        ctl.prepare("acme", &spec("api", "v3")).unwrap();
        ctl.rollback("acme", "api").unwrap();

        let record = ctl.get_app("acme", "api").unwrap().unwrap();
        assert_eq!(record.stable.tag, "v1");
        assert!(record.preview.is_none());
    }

    // ── Scale / Delete ─────────────────────────────────────────────

    #[test]
    fn scale_updates_replica_count() {
        let ctl = controller();
        ctl.deploy("acme", &spec("api", "v1")).unwrap();

        let record = ctl.scale("acme", "api", 5).unwrap();
        assert_eq!(record.stable.replicas, 5);

        let err = ctl.scale("acme", "api", 0).unwrap_err();
        assert!(matches!(err, BlueGreenError::Validation(_)));
    }

    #[test]
    fn delete_tears_everything_down() {
        let ctl = controller();
        with_ready_preview(&ctl);

        ctl.delete("acme", "api").unwrap();

        assert!(ctl.get_app("acme", "api").unwrap().is_none());
        assert!(ctl.router.route("acme/api").is_none());
        assert_eq!(ctl.board.get("acme/api"), None);
        assert!(ctl.status("acme").unwrap().is_empty());
    }

    // ── Status ─────────────────────────────────────────────────────

    #[test]
    fn status_reports_replicas_and_readiness() {
        let ctl = controller();
        ctl.deploy("acme", &spec("api", "v1")).unwrap();

        let items = ctl.status("acme").unwrap();
        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.name, "api");
        assert_eq!(item.image, "org/api:v1");
        assert_eq!(item.desired, 2);
        assert_eq!(item.current, 2);
        assert_eq!(item.available, 2);
        assert_eq!(item.preview_ready, None);
        assert_eq!(item.state, LifecycleState::NoPreview);
    }

    #[test]
    fn status_tracks_lifecycle_through_the_flow() {
        let ctl = controller();
        with_pending_preview(&ctl);

        let item = &ctl.status("acme").unwrap()[0];
        assert_eq!(item.preview_ready, None);
        assert_eq!(item.state, LifecycleState::PreviewPending);

        ctl.board.set("acme/api", true);
        let item = &ctl.status("acme").unwrap()[0];
        assert_eq!(item.preview_ready, Some(true));
        assert_eq!(item.state, LifecycleState::PreviewReady);

        ctl.promote("acme", "api").unwrap();
        let item = &ctl.status("acme").unwrap()[0];
        assert_eq!(item.image, "org/api:v2");
        assert_eq!(item.preview_ready, None);
        assert_eq!(item.state, LifecycleState::RollbackEligible);
    }

    #[test]
    fn status_is_namespace_scoped() {
        let ctl = controller();
        ctl.deploy("acme", &spec("api", "v1")).unwrap();
        ctl.deploy("globex", &spec("api", "v1")).unwrap();

        assert_eq!(ctl.status("acme").unwrap().len(), 1);
        assert_eq!(ctl.status("globex").unwrap().len(), 1);
        assert!(ctl.status("initech").unwrap().is_empty());
    }

    // ── End-to-end scenario ────────────────────────────────────────

    #[test]
    fn full_prepare_promote_rollback_scenario() {
        let ctl = controller();
        ctl.deploy("acme", &spec("api", "v1")).unwrap();

        // Prepare v2; readiness starts unknown.
        ctl.prepare("acme", &spec("api", "v2")).unwrap();
        assert!(matches!(
            ctl.promote("acme", "api").unwrap_err(),
            BlueGreenError::NotReady(_)
        ));

        // Probe passes.
        ctl.board.set("acme/api", true);
        ctl.promote("acme", "api").unwrap();

        let record = ctl.get_app("acme", "api").unwrap().unwrap();
        assert_eq!(record.stable.image_ref(), "org/api:v2");
        assert_eq!(record.previous_stable.as_ref().unwrap().image_ref(), "org/api:v1");

        // Regret it.
        ctl.rollback("acme", "api").unwrap();
        let record = ctl.get_app("acme", "api").unwrap().unwrap();
        assert_eq!(record.stable.image_ref(), "org/api:v1");
        assert!(record.previous_stable.is_none());
    }
}
