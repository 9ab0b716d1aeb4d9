use std::sync::Arc;

use crate::ErrorKind;
use crate::fmi2::{FmuType, LifecycleState, ModelBinding, NoopSink, Status, StepOutcome};
use crate::test::mock_model::{
    MockConfig, VR_COUNTER, VR_H, call_count, calls, initialized_instance, mock_binding,
    mock_functions, mock_instance, reset_mock,
};

#[test]
fn enter_initialization_before_setup_is_rejected_without_native_call() {
    let mut instance = mock_instance(MockConfig::default());
    let err = instance
        .enter_initialization_mode()
        .expect_err("setup experiment has not been called");
    assert_eq!(err.kind(), ErrorKind::Lifecycle);
    assert_eq!(instance.state(), LifecycleState::Instantiated);
    assert_eq!(call_count("fmi2EnterInitializationMode"), 0);
}

#[test]
fn do_step_before_exit_initialization_is_rejected() {
    let mut instance = mock_instance(MockConfig::default());
    instance.setup_experiment(None, 0.0, None).expect("setup");
    instance.enter_initialization_mode().expect("enter init");

    let err = instance.do_step(0.0, 0.1, false).expect_err("still initializing");
    assert_eq!(err.kind(), ErrorKind::Lifecycle);
    assert_eq!(call_count("fmi2DoStep"), 0);
}

#[test]
fn setup_experiment_is_accepted_once() {
    let mut instance = mock_instance(MockConfig::default());
    instance.setup_experiment(Some(1e-6), 0.0, Some(1.0)).expect("setup");
    assert_eq!(instance.state(), LifecycleState::ExperimentSetUp);

    let err = instance
        .setup_experiment(None, 0.0, None)
        .expect_err("second setup");
    assert_eq!(err.kind(), ErrorKind::Lifecycle);
    assert_eq!(call_count("fmi2SetupExperiment"), 1);
}

#[test]
fn full_co_simulation_lifecycle_reaches_step_mode_and_terminates() {
    let mut instance = initialized_instance(MockConfig::default());
    assert_eq!(instance.state(), LifecycleState::StepMode);

    assert_eq!(
        instance.do_step(0.0, 0.25, false).expect("step"),
        StepOutcome::Completed
    );
    instance.terminate().expect("terminate");
    assert_eq!(instance.state(), LifecycleState::Terminated);

    // 结束后仍可读取最终值
    assert_eq!(instance.get_integer(&[VR_COUNTER]).expect("counter"), [1]);
    let h = instance.get_real(&[VR_H]).expect("h");
    assert!((h[0] - 0.5).abs() < 1e-12);

    let err = instance.do_step(0.25, 0.25, false).expect_err("terminated");
    assert_eq!(err.kind(), ErrorKind::Lifecycle);

    drop(instance);
    assert_eq!(call_count("fmi2FreeInstance"), 1);
    assert_eq!(
        calls()
            .into_iter()
            .filter(|c| !c.starts_with("fmi2Get"))
            .collect::<Vec<_>>(),
        [
            "fmi2Instantiate",
            "fmi2SetupExperiment",
            "fmi2EnterInitializationMode",
            "fmi2ExitInitializationMode",
            "fmi2DoStep",
            "fmi2Terminate",
            "fmi2FreeInstance",
        ]
    );
}

#[test]
fn error_status_moves_instance_to_failed_and_reset_recovers() {
    let mut instance = mock_instance(MockConfig {
        fail_exit_initialization: true,
        ..MockConfig::default()
    });
    instance.setup_experiment(None, 0.0, None).expect("setup");
    instance.enter_initialization_mode().expect("enter init");

    let err = instance.exit_initialization_mode().expect_err("model fails");
    assert_eq!(err.kind(), ErrorKind::NativeStatus);
    assert_eq!(err.status(), Some(Status::Error));
    assert_eq!(instance.state(), LifecycleState::Failed);

    let err = instance.terminate().expect_err("terminate after error");
    assert_eq!(err.kind(), ErrorKind::Lifecycle);
    assert_eq!(call_count("fmi2Terminate"), 0);

    instance.reset().expect("reset");
    assert_eq!(instance.state(), LifecycleState::Instantiated);
}

#[test]
fn cancel_step_only_leaves_reset_available() {
    let mut instance = initialized_instance(MockConfig {
        pending_polls: Some(5),
        ..MockConfig::default()
    });

    assert_eq!(
        instance.do_step(0.0, 0.1, false).expect("step"),
        StepOutcome::Pending
    );
    assert_eq!(instance.state(), LifecycleState::StepPending);

    let err = instance.get_real(&[VR_H]).expect_err("step in flight");
    assert_eq!(err.kind(), ErrorKind::Lifecycle);

    instance.cancel_step().expect("cancel");
    assert_eq!(instance.state(), LifecycleState::StepCanceled);
    assert!(instance.terminate().is_err());
    instance.reset().expect("reset");
    assert_eq!(instance.state(), LifecycleState::Instantiated);
}

#[test]
fn pending_step_is_completed_through_status_polling() {
    let mut instance = initialized_instance(MockConfig {
        pending_polls: Some(2),
        ..MockConfig::default()
    });

    assert_eq!(
        instance.do_step(0.0, 0.1, false).expect("step"),
        StepOutcome::Pending
    );
    assert_eq!(instance.poll_pending_step().expect("poll"), StepOutcome::Pending);
    assert_eq!(instance.poll_pending_step().expect("poll"), StepOutcome::Pending);
    assert_eq!(instance.poll_pending_step().expect("poll"), StepOutcome::Completed);
    assert_eq!(instance.state(), LifecycleState::StepMode);
    assert_eq!(instance.get_integer(&[VR_COUNTER]).expect("counter"), [1]);
}

#[test]
fn binding_reports_version_and_types_platform() {
    reset_mock(MockConfig::default());
    let binding = mock_binding();
    assert_eq!(binding.version().expect("version"), "2.0");
    assert_eq!(binding.types_platform().expect("platform"), "default");
    assert_eq!(binding.fmu_type(), FmuType::CoSimulation);
    assert!(binding.path().is_none());
}

#[test]
fn missing_required_entry_point_is_a_capability_error() {
    let err = ModelBinding::from_functions(mock_functions(), FmuType::ModelExchange, Arc::new(NoopSink))
        .expect_err("model exchange entry points are missing");
    assert_eq!(err.kind(), ErrorKind::Capability);
    assert!(err.to_string().contains("fmi2EnterEventMode"), "{err}");

    let mut functions = mock_functions();
    functions.do_step = None;
    let err = ModelBinding::from_functions(functions, FmuType::CoSimulation, Arc::new(NoopSink))
        .expect_err("DoStep is required for co-simulation");
    assert!(err.to_string().contains("fmi2DoStep"), "{err}");
}

#[test]
fn optional_entry_point_is_reported_when_invoked() {
    reset_mock(MockConfig::default());
    let mut functions = mock_functions();
    functions.get_directional_derivative = None;
    let binding = ModelBinding::from_functions(functions, FmuType::CoSimulation, Arc::new(NoopSink))
        .expect("optional entry points may be absent");
    let mut instance = binding
        .instantiate("mock", "{mock-guid}", None, false, false)
        .expect("instantiate");
    instance.setup_experiment(None, 0.0, None).expect("setup");
    instance.enter_initialization_mode().expect("enter init");

    let err = instance
        .get_directional_derivative(&[0], &[1], &[1.0])
        .expect_err("entry point missing");
    assert_eq!(err.kind(), ErrorKind::Capability);
}

#[test]
fn null_instance_handle_is_reported() {
    reset_mock(MockConfig {
        refuse_instantiation: true,
        ..MockConfig::default()
    });
    let err = mock_binding()
        .instantiate("mock", "{mock-guid}", None, false, false)
        .expect_err("model refuses");
    assert_eq!(err.kind(), ErrorKind::NativeStatus);
    assert_eq!(call_count("fmi2FreeInstance"), 0);
}
