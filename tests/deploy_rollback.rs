//! Deployment controller failure paths: rollback, bounded retries, aborts.

use haproxy_reconciler::deploy::{DeployError, DeployOutcome};

mod common;

use common::Fixture;

const OLD: &str = "# running config\n";
const NEW: &str = "# candidate config\n";

fn stage(fx: &Fixture) -> std::path::PathBuf {
    std::fs::write(fx.staging(), NEW).unwrap();
    fx.staging()
}

#[tokio::test]
async fn test_successful_deploy_backs_up_then_restarts() {
    let fx = Fixture::new();
    fx.write_active(OLD);
    let controller = fx.controller(&Fixture::deploy_config());

    let outcome = controller.deploy(&stage(&fx)).await;

    assert!(matches!(outcome, DeployOutcome::Applied));
    assert_eq!(fx.read_active(), NEW);
    assert_eq!(fx.proxy.validated(), vec![NEW.to_string()]);
    assert_eq!(fx.proxy.restarted_with(), vec![NEW.to_string()]);

    let backups = fx.backups();
    assert_eq!(backups.len(), 1);
    assert_eq!(std::fs::read_to_string(&backups[0].path).unwrap(), OLD);
}

#[tokio::test]
async fn test_validation_failure_restores_backup() {
    let fx = Fixture::new();
    fx.write_active(OLD);
    fx.proxy.script_validation(&[false]);
    let controller = fx.controller(&Fixture::deploy_config());

    let outcome = controller.deploy(&stage(&fx)).await;

    match outcome {
        DeployOutcome::RolledBack { cause } => assert!(matches!(cause, DeployError::Validation(_))),
        other => panic!("expected rollback, got {:?}", other),
    }
    assert_eq!(fx.read_active(), OLD);
    // the rejected candidate never ran
    assert_eq!(fx.proxy.restarted_with(), vec![OLD.to_string()]);
}

#[tokio::test]
async fn test_restart_failure_restores_backup() {
    let fx = Fixture::new();
    fx.write_active(OLD);
    fx.proxy.script_restarts(&[false]);
    let controller = fx.controller(&Fixture::deploy_config());

    let outcome = controller.deploy(&stage(&fx)).await;

    match outcome {
        DeployOutcome::RolledBack { cause } => assert!(matches!(cause, DeployError::Restart(_))),
        other => panic!("expected rollback, got {:?}", other),
    }
    assert_eq!(fx.read_active(), OLD);
    assert_eq!(fx.proxy.restarted_with(), vec![NEW.to_string(), OLD.to_string()]);
}

#[tokio::test]
async fn test_restore_retries_then_succeeds() {
    let fx = Fixture::new();
    fx.write_active(OLD);
    fx.proxy.script_validation(&[false]);
    fx.proxy.script_restarts(&[false, false, true]);
    let controller = fx.controller(&Fixture::deploy_config());

    let outcome = controller.deploy(&stage(&fx)).await;

    assert!(matches!(outcome, DeployOutcome::RolledBack { .. }));
    assert_eq!(fx.proxy.restarted_with().len(), 3);
}

#[tokio::test]
async fn test_restart_budget_exhausted_requires_manual_intervention() {
    let fx = Fixture::new();
    fx.write_active(OLD);
    fx.proxy.script_validation(&[false]);
    fx.proxy.script_restarts(&[false; 10]);
    let controller = fx.controller(&Fixture::deploy_config());

    let outcome = controller.deploy(&stage(&fx)).await;

    match outcome {
        DeployOutcome::ManualIntervention { cause } => {
            assert!(matches!(cause, DeployError::ManualInterventionRequired { attempts: 3 }))
        }
        other => panic!("expected manual intervention, got {:?}", other),
    }
    // bounded: exactly max_restart_attempts restarts, all on the restored config
    let restarts = fx.proxy.restarted_with();
    assert_eq!(restarts.len(), 3);
    assert!(restarts.iter().all(|c| c == OLD));
    assert_eq!(fx.read_active(), OLD);
}

#[tokio::test]
async fn test_failure_without_backup_requires_manual_intervention() {
    let fx = Fixture::new();
    fx.proxy.script_validation(&[false]);
    let controller = fx.controller(&Fixture::deploy_config());

    let outcome = controller.deploy(&stage(&fx)).await;

    match outcome {
        DeployOutcome::ManualIntervention { cause } => assert!(matches!(cause, DeployError::Restore(_))),
        other => panic!("expected manual intervention, got {:?}", other),
    }
    assert!(fx.proxy.restarted_with().is_empty());
}

#[tokio::test]
async fn test_backup_failure_is_not_fatal_by_default() {
    let fx = Fixture::new();
    fx.write_active(OLD);
    fx.files.block(fx.backup_dir());
    let controller = fx.controller(&Fixture::deploy_config());

    let outcome = controller.deploy(&stage(&fx)).await;

    assert!(matches!(outcome, DeployOutcome::Applied));
    assert_eq!(fx.read_active(), NEW);
    assert!(fx.backups().is_empty());
}

#[tokio::test]
async fn test_required_backup_failure_aborts_before_touching_proxy() {
    let fx = Fixture::new();
    fx.write_active(OLD);
    fx.files.block(fx.backup_dir());
    let mut config = Fixture::deploy_config();
    config.require_backup = true;
    let controller = fx.controller(&config);

    let outcome = controller.deploy(&stage(&fx)).await;

    match outcome {
        DeployOutcome::Aborted { cause } => assert!(matches!(cause, DeployError::Backup { .. })),
        other => panic!("expected abort, got {:?}", other),
    }
    assert_eq!(fx.read_active(), OLD);
    assert_eq!(fx.proxy.invocations(), 0);
}

#[tokio::test]
async fn test_write_failure_aborts_before_touching_proxy() {
    let fx = Fixture::new();
    fx.write_active(OLD);
    fx.files.block(fx.active());
    let controller = fx.controller(&Fixture::deploy_config());

    let outcome = controller.deploy(&stage(&fx)).await;

    match outcome {
        DeployOutcome::Aborted { cause } => assert!(matches!(cause, DeployError::Write { .. })),
        other => panic!("expected abort, got {:?}", other),
    }
    assert_eq!(fx.read_active(), OLD);
    assert_eq!(fx.proxy.invocations(), 0);
}
