//! Reconciler tests against an in-memory policy store with real
//! grant/revoke/listing semantics.

use std::cell::RefCell;
use std::collections::HashMap;

use serde_json::Value;

use aegis_mgmt::{Invoker, ObjectName, Transport, TransportFault};

use crate::error::PolicyError;
use crate::event::{Event, RecordingSink};
use crate::request::ReconciliationRequest;
use crate::store::{grantee_value, PolicyStore, OP_GRANT, OP_LIST_GRANTS, OP_REVOKE};
use crate::subject::{Permission, PrincipalKind, Subject};

use super::{Options, Outcome, Reconciler};

// ============================================================================
// In-memory policy store
// ============================================================================

/// Wire-level fake of the remote policy store. Re-granting to a grantee
/// that already holds grants is an error, like the real store.
struct FakeStore {
    grants: RefCell<HashMap<String, Vec<Value>>>,
    log: RefCell<Vec<String>>,
    fail_grant_for: Option<String>,
}

impl FakeStore {
    fn new() -> Self {
        Self {
            grants: RefCell::new(HashMap::new()),
            log: RefCell::new(Vec::new()),
            fail_grant_for: None,
        }
    }

    fn seeded(subject: &Subject, permissions: &[Permission]) -> Self {
        let store = Self::new();
        store.grants.borrow_mut().insert(
            grantee_value(subject).to_string(),
            permissions
                .iter()
                .map(|p| serde_json::to_value(p).unwrap())
                .collect(),
        );
        store
    }

    fn failing_grant_for(mut self, name: &str) -> Self {
        self.fail_grant_for = Some(name.to_string());
        self
    }

    fn permissions(&self, subject: &Subject) -> Vec<Permission> {
        self.grants
            .borrow()
            .get(&grantee_value(subject).to_string())
            .map(|values| {
                values
                    .iter()
                    .map(|v| serde_json::from_value(v.clone()).unwrap())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn log(&self) -> Vec<String> {
        self.log.borrow().clone()
    }
}

fn grantee_label(grantee: &Value) -> String {
    grantee["principal"]["name"]
        .as_str()
        .or_else(|| grantee["codebase"]["location"].as_str())
        .unwrap_or("?")
        .to_string()
}

impl Transport for FakeStore {
    fn read_attribute(
        &self,
        object: &ObjectName,
        attribute: &str,
    ) -> Result<Value, TransportFault> {
        Err(TransportFault::AttributeNotFound {
            object: object.to_string(),
            attribute: attribute.to_string(),
        })
    }

    fn invoke(
        &self,
        _object: &ObjectName,
        operation: &str,
        parameter: &[Value],
        _signature: &[&str],
    ) -> Result<Value, TransportFault> {
        match operation {
            OP_LIST_GRANTS => {
                let grantee = &parameter[0];
                self.log
                    .borrow_mut()
                    .push(format!("list:{}", grantee_label(grantee)));
                let grants = self.grants.borrow();
                let permissions = grants
                    .get(&grantee.to_string())
                    .cloned()
                    .unwrap_or_default();
                Ok(Value::Array(permissions))
            }
            OP_GRANT => {
                for grant in parameter[0].as_array().into_iter().flatten() {
                    let grantee = &grant["grantee"];
                    let label = grantee_label(grantee);
                    self.log.borrow_mut().push(format!("grant:{label}"));
                    if self.fail_grant_for.as_deref() == Some(label.as_str()) {
                        return Err(TransportFault::Other("injected store failure".to_string()));
                    }
                    let mut grants = self.grants.borrow_mut();
                    let entry = grants.entry(grantee.to_string()).or_default();
                    if !entry.is_empty() {
                        return Err(TransportFault::Other(format!(
                            "grantee {label} already holds grants"
                        )));
                    }
                    entry.extend(grant["permissions"].as_array().cloned().unwrap_or_default());
                }
                Ok(Value::Null)
            }
            OP_REVOKE => {
                for grant in parameter[0].as_array().into_iter().flatten() {
                    let grantee = &grant["grantee"];
                    let label = grantee_label(grantee);
                    self.log.borrow_mut().push(format!("revoke:{label}"));
                    let mut grants = self.grants.borrow_mut();
                    let Some(entry) = grants.get_mut(&grantee.to_string()) else {
                        return Err(TransportFault::Other(format!(
                            "grantee {label} holds no grants"
                        )));
                    };
                    for permission in grant["permissions"].as_array().into_iter().flatten() {
                        entry.retain(|existing| existing != permission);
                    }
                    if entry.is_empty() {
                        grants.remove(&grantee.to_string());
                    }
                }
                Ok(Value::Null)
            }
            other => Err(TransportFault::Other(format!(
                "operation {other} not supported"
            ))),
        }
    }

    fn query_names(&self, _pattern: &ObjectName) -> Result<Vec<ObjectName>, TransportFault> {
        Ok(Vec::new())
    }
}

// ============================================================================
// Helper builders
// ============================================================================

fn read_permission() -> Permission {
    Permission::new("aegis.io.FilePermission", "/var/log", "read")
}

fn all_permission() -> Permission {
    Permission::new("aegis.security.AllPermission", "", "")
}

fn store_handle() -> ObjectName {
    ObjectName::new("aegis.security", &[("Name", "GlobalPolicyStore")]).unwrap()
}

fn run(
    fake: &FakeStore,
    request: ReconciliationRequest,
    options: Options,
) -> (crate::error::Result<super::Report>, Vec<Event>) {
    let invoker = Invoker::new(fake);
    let sink = RecordingSink::new();
    let store = PolicyStore::new(&invoker, store_handle(), &sink);
    let reconciler = Reconciler::new(&store, &sink, options);
    let result = reconciler.execute(request);
    let events = sink.events();
    (result, events)
}

fn outcomes(report: &super::Report) -> Vec<Outcome> {
    report
        .entries
        .iter()
        .map(|entry| entry.outcome.clone())
        .collect()
}

// ============================================================================
// Revoke phase
// ============================================================================

#[test]
fn revoke_existing_principal() {
    let role = Subject::principal("role1", PrincipalKind::Role).retract(read_permission());
    let fake = FakeStore::seeded(&role, &[read_permission()]);

    let mut request = ReconciliationRequest::new();
    request.add_revoke(role.clone()).unwrap();

    let (result, events) = run(&fake, request, Options::default());
    let report = result.unwrap();
    assert!(report.completed);
    assert_eq!(outcomes(&report), [Outcome::Revoked]);

    // exactly one existence check and one revoke call
    assert_eq!(fake.log(), ["list:role1", "revoke:role1"]);
    assert!(fake.permissions(&role).is_empty());

    // begin-revoke then success-revoke
    assert_eq!(
        events,
        [
            Event::begin("principal", "role1", OP_REVOKE),
            Event::success("principal", "role1", OP_REVOKE),
        ]
    );
}

#[test]
fn revoke_absent_subject_is_soft() {
    let role = Subject::principal("ghost", PrincipalKind::Role).retract(read_permission());
    let fake = FakeStore::new();

    let mut request = ReconciliationRequest::new();
    request.add_revoke(role).unwrap();

    let (result, events) = run(&fake, request, Options::default());
    let report = result.unwrap();
    assert!(report.completed);
    assert!(report.is_clean());
    assert_eq!(outcomes(&report), [Outcome::NotFound]);

    // existence check only, no mutation
    assert_eq!(fake.log(), ["list:ghost"]);
    assert_eq!(events, [Event::not_found("principal", "ghost")]);
}

#[test]
fn revoke_with_no_declared_permissions_is_skipped() {
    let fake = FakeStore::new();
    let mut request = ReconciliationRequest::new();
    request
        .add_revoke(Subject::principal("idle", PrincipalKind::User))
        .unwrap();

    let (result, _) = run(&fake, request, Options::default());
    assert_eq!(outcomes(&result.unwrap()), [Outcome::SkippedNoOp]);
    // zero remote calls for the skipped direction
    assert!(fake.log().is_empty());
}

#[test]
fn revoke_narrows_to_present_permissions() {
    let declared = Subject::principal("role2", PrincipalKind::Role)
        .retract(read_permission())
        .retract(all_permission());
    // only the read permission is actually held
    let fake = FakeStore::seeded(&declared, &[read_permission()]);

    let mut request = ReconciliationRequest::new();
    request.add_revoke(declared.clone()).unwrap();

    let (result, _) = run(&fake, request, Options::default());
    assert_eq!(outcomes(&result.unwrap()), [Outcome::Revoked]);
    assert!(fake.permissions(&declared).is_empty());
}

// ============================================================================
// Assign phase
// ============================================================================

#[test]
fn assign_new_codebase() {
    let codebase = Subject::codebase("file:/deploy/app.jar").grant(all_permission());
    let fake = FakeStore::new();

    let mut request = ReconciliationRequest::new();
    request.add_assign(codebase.clone()).unwrap();

    let (result, events) = run(&fake, request, Options::default());
    assert_eq!(outcomes(&result.unwrap()), [Outcome::Granted]);

    // existence check came back absent, grant issued
    assert_eq!(
        fake.log(),
        ["list:file:/deploy/app.jar", "grant:file:/deploy/app.jar"]
    );
    // final state: exactly the declared permission
    assert_eq!(fake.permissions(&codebase), [all_permission()]);
    assert_eq!(
        events,
        [
            Event::begin("codebase", "file:/deploy/app.jar", OP_GRANT),
            Event::success("codebase", "file:/deploy/app.jar", OP_GRANT),
        ]
    );
}

#[test]
fn assign_existing_subject_is_soft_already_exists() {
    let role = Subject::principal("role3", PrincipalKind::Role).grant(all_permission());
    let fake = FakeStore::seeded(&role, &[read_permission()]);

    let mut request = ReconciliationRequest::new();
    request.add_assign(role.clone()).unwrap();

    let (result, events) = run(&fake, request, Options::default());
    let report = result.unwrap();
    assert!(report.is_clean());
    assert_eq!(outcomes(&report), [Outcome::AlreadyExists]);

    // no revoke set declared, so the clear is a no-op and the grant is
    // skipped; prior state is untouched
    assert_eq!(fake.log(), ["list:role3"]);
    assert_eq!(fake.permissions(&role), [read_permission()]);
    assert_eq!(events, [Event::already_exists("principal", "role3")]);
}

#[test]
fn assign_replaces_stale_grants_revoke_before_grant() {
    let stale = read_permission();
    let fresh = all_permission();
    let role = Subject::principal("role4", PrincipalKind::Role)
        .grant(fresh.clone())
        .retract(stale.clone());
    let fake = FakeStore::seeded(&role, &[stale]);

    let mut request = ReconciliationRequest::new();
    request.add_assign(role.clone()).unwrap();

    let (result, _) = run(&fake, request, Options::default());
    assert_eq!(outcomes(&result.unwrap()), [Outcome::Granted]);

    // clear completes before the grant's existence check runs
    assert_eq!(
        fake.log(),
        ["list:role4", "revoke:role4", "list:role4", "grant:role4"]
    );
    assert_eq!(fake.permissions(&role), [fresh]);
}

// ============================================================================
// Phase ordering
// ============================================================================

#[test]
fn all_revocations_complete_before_any_assignment() {
    let withdraw = Subject::principal("old", PrincipalKind::Role).retract(read_permission());
    let grant = Subject::codebase("file:/deploy/new.jar").grant(all_permission());
    let fake = FakeStore::seeded(&withdraw, &[read_permission()]);

    let mut request = ReconciliationRequest::new();
    // declared assign first; the revoke phase still runs first
    request.add_assign(grant).unwrap();
    request.add_revoke(withdraw).unwrap();

    let (result, _) = run(&fake, request, Options::default());
    result.unwrap();
    assert_eq!(
        fake.log(),
        [
            "list:old",
            "revoke:old",
            "list:file:/deploy/new.jar",
            "grant:file:/deploy/new.jar"
        ]
    );
}

// ============================================================================
// Idempotence
// ============================================================================

#[test]
fn second_application_yields_only_soft_conditions() {
    let withdraw = Subject::principal("legacy", PrincipalKind::Role).retract(read_permission());
    let grant = Subject::codebase("file:/deploy/app.jar").grant(all_permission());
    let fake = FakeStore::seeded(&withdraw, &[read_permission()]);

    let build = || {
        let mut request = ReconciliationRequest::new();
        request.add_revoke(withdraw.clone()).unwrap();
        request.add_assign(grant.clone()).unwrap();
        request
    };

    let (first, _) = run(&fake, build(), Options::default());
    assert_eq!(
        outcomes(&first.unwrap()),
        [Outcome::Revoked, Outcome::Granted]
    );
    let state_after_first = fake.permissions(&grant);

    let (second, _) = run(&fake, build(), Options::default());
    let report = second.unwrap();
    assert!(report.is_clean());
    assert_eq!(
        outcomes(&report),
        [Outcome::NotFound, Outcome::AlreadyExists]
    );
    assert!(report.entries.iter().all(|e| e.outcome.is_soft()));
    // the end state did not change
    assert_eq!(fake.permissions(&grant), state_after_first);
}

// ============================================================================
// Error policy
// ============================================================================

#[test]
fn continue_on_error_processes_remaining_subjects() {
    let failing = Subject::codebase("file:/deploy/bad.jar").grant(all_permission());
    let healthy = Subject::codebase("file:/deploy/good.jar").grant(all_permission());
    let fake = FakeStore::new().failing_grant_for("file:/deploy/bad.jar");

    let mut request = ReconciliationRequest::new();
    request.add_assign(failing).unwrap();
    request.add_assign(healthy.clone()).unwrap();

    let (result, events) = run(
        &fake,
        request,
        Options {
            fail_on_error: false,
        },
    );
    let report = result.unwrap();
    assert!(report.completed);
    assert_eq!(report.failures(), 1);
    assert!(matches!(report.entries[0].outcome, Outcome::Failed(_)));
    assert_eq!(report.entries[1].outcome, Outcome::Granted);
    assert_eq!(fake.permissions(&healthy), [all_permission()]);

    // the failure was reported as a fatal event with its cause attached
    assert!(events.iter().any(|event| {
        event.severity == crate::event::Severity::Fatal
            && event.detail.as_deref().is_some_and(|d| d.contains("injected"))
    }));
}

#[test]
fn fail_fast_aborts_before_next_subject() {
    let failing = Subject::codebase("file:/deploy/bad.jar").grant(all_permission());
    let healthy = Subject::codebase("file:/deploy/good.jar").grant(all_permission());
    let fake = FakeStore::new().failing_grant_for("file:/deploy/bad.jar");

    let mut request = ReconciliationRequest::new();
    request.add_assign(failing).unwrap();
    request.add_assign(healthy.clone()).unwrap();

    let (result, _) = run(&fake, request, Options { fail_on_error: true });
    let err = result.unwrap_err();
    assert!(matches!(err, PolicyError::Management(_)));
    assert!(!err.is_validation());

    // the second subject was never touched
    assert!(fake.permissions(&healthy).is_empty());
    assert!(!fake.log().iter().any(|line| line.contains("good.jar")));
}

// ============================================================================
// Validation gate
// ============================================================================

#[test]
fn empty_request_aborts_before_any_remote_call() {
    let fake = FakeStore::new();
    let (result, _) = run(&fake, ReconciliationRequest::new(), Options::default());
    assert!(matches!(result.unwrap_err(), PolicyError::EmptyRequest));
    assert!(fake.log().is_empty());
}

#[test]
fn invalid_subject_aborts_before_any_remote_call() {
    let fake = FakeStore::new();
    let mut request = ReconciliationRequest::new();
    request
        .add_assign(Subject::codebase("not a url").grant(all_permission()))
        .unwrap();

    let (result, _) = run(&fake, request, Options::default());
    assert!(result.unwrap_err().is_validation());
    assert!(fake.log().is_empty());
}
