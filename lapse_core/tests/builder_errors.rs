use lapse_core::mocks::NullActuator;
use lapse_core::{BuildError, ClassifierCfg, Scheduler, StatusCfg, TriggerCfg};

fn expect_build_error(b: lapse_core::SchedulerBuilder) -> BuildError {
    match b.build() {
        Ok(_) => panic!("expected build error"),
        Err(e) => e
            .downcast_ref::<BuildError>()
            .cloned()
            .expect("BuildError in report"),
    }
}

#[test]
fn missing_actuator() {
    assert_eq!(
        expect_build_error(Scheduler::builder()),
        BuildError::MissingActuator
    );
}

#[test]
fn invalid_trigger_attempts() {
    let b = Scheduler::builder()
        .with_actuator(NullActuator)
        .with_trigger(TriggerCfg {
            max_attempts: 0,
            ..TriggerCfg::default()
        });
    assert_eq!(
        expect_build_error(b),
        BuildError::InvalidConfig("max_attempts must be >= 1")
    );
}

#[test]
fn non_finite_heating_threshold() {
    let b = Scheduler::builder()
        .with_actuator(NullActuator)
        .with_classifier(ClassifierCfg {
            heating_nozzle_c: f32::NAN,
            ..ClassifierCfg::default()
        });
    assert!(matches!(expect_build_error(b), BuildError::InvalidConfig(_)));
}

#[test]
fn empty_token_lists() {
    let b = Scheduler::builder()
        .with_actuator(NullActuator)
        .with_classifier(ClassifierCfg {
            idle_tokens: Vec::new(),
            ..ClassifierCfg::default()
        });
    assert!(matches!(expect_build_error(b), BuildError::InvalidConfig(_)));
}

#[test]
fn zero_log_capacity() {
    let b = Scheduler::builder()
        .with_actuator(NullActuator)
        .with_status(StatusCfg { log_capacity: 0 });
    assert!(matches!(expect_build_error(b), BuildError::InvalidConfig(_)));
}

#[test]
fn defaults_build() {
    let mut s = Scheduler::builder()
        .with_actuator(NullActuator)
        .build()
        .expect("defaults are valid");
    assert!(!s.status().actuator_ready);
    s.shutdown();
}
