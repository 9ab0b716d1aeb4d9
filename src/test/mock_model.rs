//! 进程内的模拟模型：入口点直接填进入口点表，状态放在线程局部变量里，
//! 每个测试线程各有一份。
//!
//! 变量：h = k * t（output, vr 0），k（parameter, vr 1），counter（output, vr 2），
//! even（output, vr 3），label（parameter, vr 4）。

use std::cell::RefCell;
use std::ffi::CString;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::fmi2::ffi::*;
use crate::fmi2::{
    Fmi2Functions, FmuType, LogRecord, LogSink, ModelBinding, ModelInstance, NoopSink,
};
use crate::model::ModelDescription;

pub const VR_H: u32 = 0;
pub const VR_K: u32 = 1;
pub const VR_COUNTER: u32 = 2;
pub const VR_EVEN: u32 = 3;
pub const VR_LABEL: u32 = 4;

const OK: fmi2Status = 0;
const DISCARD: fmi2Status = 2;
const ERROR: fmi2Status = 3;
const PENDING: fmi2Status = 5;

#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// 结束时间超过该值的 DoStep 返回 Discard
    pub discard_at: Option<f64>,
    /// Discard 时把 terminated 状态置位
    pub terminate_on_discard: bool,
    /// DoStep 返回 Pending，之后第 n+1 次 DoStepStatus 查询才完成
    pub pending_polls: Option<u32>,
    pub fail_exit_initialization: bool,
    pub refuse_instantiation: bool,
    /// 每次 DoStep 占用的墙钟时间
    pub step_delay: Option<Duration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Snapshot {
    time: f64,
    k: f64,
    counter: i32,
}

struct MockModel {
    config: MockConfig,
    calls: Vec<&'static str>,
    time: f64,
    k: f64,
    counter: i32,
    label: CString,
    in_flight: Option<(f64, u32)>,
    terminated: bool,
    last_successful_time: f64,
    live_states: i32,
}

impl MockModel {
    fn new(config: MockConfig) -> MockModel {
        MockModel {
            config,
            calls: Vec::new(),
            time: 0.0,
            k: 2.0,
            counter: 0,
            label: c"mock".to_owned(),
            in_flight: None,
            terminated: false,
            last_successful_time: 0.0,
            live_states: 0,
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            time: self.time,
            k: self.k,
            counter: self.counter,
        }
    }

    fn finish_step(&mut self, to: f64) {
        self.time = to;
        self.last_successful_time = to;
        self.counter += 1;
    }
}

thread_local! {
    static MODEL: RefCell<MockModel> = RefCell::new(MockModel::new(MockConfig::default()));
}

fn with_model<R>(f: impl FnOnce(&mut MockModel) -> R) -> R {
    MODEL.with(|m| f(&mut m.borrow_mut()))
}

fn record(name: &'static str) {
    with_model(|m| m.calls.push(name));
}

/// 重置当前线程的模拟模型
pub fn reset_mock(config: MockConfig) {
    with_model(|m| *m = MockModel::new(config));
}

pub fn calls() -> Vec<&'static str> {
    with_model(|m| m.calls.clone())
}

pub fn call_count(name: &str) -> usize {
    with_model(|m| m.calls.iter().filter(|c| **c == name).count())
}

pub fn live_states() -> i32 {
    with_model(|m| m.live_states)
}

pub fn model_time() -> f64 {
    with_model(|m| m.time)
}

unsafe fn slice<'a, T>(ptr: *const T, n: usize) -> &'a [T] {
    if n == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(ptr, n) }
    }
}

unsafe fn slice_mut<'a, T>(ptr: *mut T, n: usize) -> &'a mut [T] {
    if n == 0 {
        &mut []
    } else {
        unsafe { std::slice::from_raw_parts_mut(ptr, n) }
    }
}

unsafe extern "C" fn get_types_platform() -> fmi2String {
    c"default".as_ptr()
}

unsafe extern "C" fn get_version() -> fmi2String {
    c"2.0".as_ptr()
}

unsafe extern "C" fn set_debug_logging(
    _c: fmi2Component,
    _on: fmi2Boolean,
    _n: usize,
    _categories: *const fmi2String,
) -> fmi2Status {
    record("fmi2SetDebugLogging");
    OK
}

unsafe extern "C" fn instantiate(
    _name: fmi2String,
    _ty: fmi2Type,
    _guid: fmi2String,
    _resources: fmi2String,
    callbacks: *const fmi2CallbackFunctions,
    _visible: fmi2Boolean,
    _logging_on: fmi2Boolean,
) -> fmi2Component {
    record("fmi2Instantiate");
    if with_model(|m| m.config.refuse_instantiation) {
        return std::ptr::null_mut();
    }
    let callbacks = unsafe { &*callbacks };
    if let Some(logger) = callbacks.logger {
        let env = callbacks.component_environment;
        unsafe { logger(env, c"mock".as_ptr(), OK, c"logStatusOK".as_ptr(), c"instantiated as %s".as_ptr()) };
    }
    std::ptr::NonNull::<u8>::dangling().as_ptr() as fmi2Component
}

unsafe extern "C" fn free_instance(_c: fmi2Component) {
    record("fmi2FreeInstance");
}

unsafe extern "C" fn setup_experiment(
    _c: fmi2Component,
    _tolerance_defined: fmi2Boolean,
    _tolerance: fmi2Real,
    start_time: fmi2Real,
    _stop_time_defined: fmi2Boolean,
    _stop_time: fmi2Real,
) -> fmi2Status {
    record("fmi2SetupExperiment");
    with_model(|m| {
        m.time = start_time;
        m.last_successful_time = start_time;
    });
    OK
}

unsafe extern "C" fn enter_initialization_mode(_c: fmi2Component) -> fmi2Status {
    record("fmi2EnterInitializationMode");
    OK
}

unsafe extern "C" fn exit_initialization_mode(_c: fmi2Component) -> fmi2Status {
    record("fmi2ExitInitializationMode");
    if with_model(|m| m.config.fail_exit_initialization) {
        ERROR
    } else {
        OK
    }
}

unsafe extern "C" fn terminate(_c: fmi2Component) -> fmi2Status {
    record("fmi2Terminate");
    OK
}

unsafe extern "C" fn reset(_c: fmi2Component) -> fmi2Status {
    record("fmi2Reset");
    with_model(|m| {
        m.time = 0.0;
        m.k = 2.0;
        m.counter = 0;
        m.terminated = false;
        m.in_flight = None;
    });
    OK
}

unsafe extern "C" fn get_real(
    _c: fmi2Component,
    vr: *const fmi2ValueReference,
    n: usize,
    value: *mut fmi2Real,
) -> fmi2Status {
    record("fmi2GetReal");
    let (vr, value) = unsafe { (slice(vr, n), slice_mut(value, n)) };
    with_model(|m| {
        for (r, v) in vr.iter().zip(value.iter_mut()) {
            *v = match *r {
                VR_H => m.k * m.time,
                VR_K => m.k,
                _ => return ERROR,
            };
        }
        OK
    })
}

unsafe extern "C" fn get_integer(
    _c: fmi2Component,
    vr: *const fmi2ValueReference,
    n: usize,
    value: *mut fmi2Integer,
) -> fmi2Status {
    record("fmi2GetInteger");
    let (vr, value) = unsafe { (slice(vr, n), slice_mut(value, n)) };
    with_model(|m| {
        for (r, v) in vr.iter().zip(value.iter_mut()) {
            match *r {
                VR_COUNTER => *v = m.counter,
                _ => return ERROR,
            }
        }
        OK
    })
}

unsafe extern "C" fn get_boolean(
    _c: fmi2Component,
    vr: *const fmi2ValueReference,
    n: usize,
    value: *mut fmi2Boolean,
) -> fmi2Status {
    record("fmi2GetBoolean");
    let (vr, value) = unsafe { (slice(vr, n), slice_mut(value, n)) };
    with_model(|m| {
        for (r, v) in vr.iter().zip(value.iter_mut()) {
            match *r {
                VR_EVEN => *v = if m.counter % 2 == 0 { fmi2True } else { fmi2False },
                _ => return ERROR,
            }
        }
        OK
    })
}

unsafe extern "C" fn get_string(
    _c: fmi2Component,
    vr: *const fmi2ValueReference,
    n: usize,
    value: *mut fmi2String,
) -> fmi2Status {
    record("fmi2GetString");
    let (vr, value) = unsafe { (slice(vr, n), slice_mut(value, n)) };
    with_model(|m| {
        for (r, v) in vr.iter().zip(value.iter_mut()) {
            match *r {
                VR_LABEL => *v = m.label.as_ptr(),
                _ => return ERROR,
            }
        }
        OK
    })
}

unsafe extern "C" fn set_real(
    _c: fmi2Component,
    vr: *const fmi2ValueReference,
    n: usize,
    value: *const fmi2Real,
) -> fmi2Status {
    record("fmi2SetReal");
    let (vr, value) = unsafe { (slice(vr, n), slice(value, n)) };
    with_model(|m| {
        for (r, v) in vr.iter().zip(value) {
            match *r {
                VR_K => m.k = *v,
                _ => return ERROR,
            }
        }
        OK
    })
}

unsafe extern "C" fn set_integer(
    _c: fmi2Component,
    vr: *const fmi2ValueReference,
    n: usize,
    value: *const fmi2Integer,
) -> fmi2Status {
    record("fmi2SetInteger");
    let (vr, value) = unsafe { (slice(vr, n), slice(value, n)) };
    with_model(|m| {
        for (r, v) in vr.iter().zip(value) {
            match *r {
                VR_COUNTER => m.counter = *v,
                _ => return ERROR,
            }
        }
        OK
    })
}

unsafe extern "C" fn set_boolean(
    _c: fmi2Component,
    _vr: *const fmi2ValueReference,
    _n: usize,
    _value: *const fmi2Boolean,
) -> fmi2Status {
    record("fmi2SetBoolean");
    ERROR
}

unsafe extern "C" fn set_string(
    _c: fmi2Component,
    vr: *const fmi2ValueReference,
    n: usize,
    value: *const fmi2String,
) -> fmi2Status {
    record("fmi2SetString");
    let (vr, value) = unsafe { (slice(vr, n), slice(value, n)) };
    let copied: Vec<CString> = value
        .iter()
        .map(|p| unsafe { std::ffi::CStr::from_ptr(*p) }.to_owned())
        .collect();
    with_model(|m| {
        for (r, v) in vr.iter().zip(copied) {
            match *r {
                VR_LABEL => m.label = v,
                _ => return ERROR,
            }
        }
        OK
    })
}

unsafe extern "C" fn get_fmu_state(_c: fmi2Component, state: *mut fmi2FMUstate) -> fmi2Status {
    record("fmi2GetFMUstate");
    let snapshot = with_model(|m| {
        m.live_states += 1;
        m.snapshot()
    });
    unsafe { *state = Box::into_raw(Box::new(snapshot)) as fmi2FMUstate };
    OK
}

unsafe extern "C" fn set_fmu_state(_c: fmi2Component, state: fmi2FMUstate) -> fmi2Status {
    record("fmi2SetFMUstate");
    let snapshot = unsafe { &*(state as *const Snapshot) }.clone();
    with_model(|m| {
        m.time = snapshot.time;
        m.k = snapshot.k;
        m.counter = snapshot.counter;
        m.last_successful_time = snapshot.time;
        m.in_flight = None;
    });
    OK
}

unsafe extern "C" fn free_fmu_state(_c: fmi2Component, state: *mut fmi2FMUstate) -> fmi2Status {
    record("fmi2FreeFMUstate");
    let raw = unsafe { *state };
    if !raw.is_null() {
        drop(unsafe { Box::from_raw(raw as *mut Snapshot) });
        with_model(|m| m.live_states -= 1);
        unsafe { *state = std::ptr::null_mut() };
    }
    OK
}

fn encode(state: fmi2FMUstate) -> Vec<u8> {
    let snapshot = unsafe { &*(state as *const Snapshot) };
    serde_json::to_vec(snapshot).unwrap_or_default()
}

unsafe extern "C" fn serialized_fmu_state_size(
    _c: fmi2Component,
    state: fmi2FMUstate,
    size: *mut usize,
) -> fmi2Status {
    record("fmi2SerializedFMUstateSize");
    unsafe { *size = encode(state).len() };
    OK
}

unsafe extern "C" fn serialize_fmu_state(
    _c: fmi2Component,
    state: fmi2FMUstate,
    bytes: *mut fmi2Byte,
    size: usize,
) -> fmi2Status {
    record("fmi2SerializeFMUstate");
    let encoded = encode(state);
    if encoded.len() != size {
        return ERROR;
    }
    let out = unsafe { slice_mut(bytes as *mut u8, size) };
    out.copy_from_slice(&encoded);
    OK
}

unsafe extern "C" fn de_serialize_fmu_state(
    _c: fmi2Component,
    bytes: *const fmi2Byte,
    size: usize,
    state: *mut fmi2FMUstate,
) -> fmi2Status {
    record("fmi2DeSerializeFMUstate");
    let input = unsafe { slice(bytes as *const u8, size) };
    let Ok(snapshot) = serde_json::from_slice::<Snapshot>(input) else {
        return ERROR;
    };
    with_model(|m| m.live_states += 1);
    unsafe { *state = Box::into_raw(Box::new(snapshot)) as fmi2FMUstate };
    OK
}

unsafe extern "C" fn get_directional_derivative(
    _c: fmi2Component,
    unknowns: *const fmi2ValueReference,
    n_unknowns: usize,
    knowns: *const fmi2ValueReference,
    n_knowns: usize,
    seed: *const fmi2Real,
    sensitivity: *mut fmi2Real,
) -> fmi2Status {
    record("fmi2GetDirectionalDerivative");
    let unknowns = unsafe { slice(unknowns, n_unknowns) };
    let knowns = unsafe { slice(knowns, n_knowns) };
    let seed = unsafe { slice(seed, n_knowns) };
    let sensitivity = unsafe { slice_mut(sensitivity, n_unknowns) };
    let time = with_model(|m| m.time);
    // dh/dk = t
    for (u, out) in unknowns.iter().zip(sensitivity.iter_mut()) {
        *out = knowns
            .iter()
            .zip(seed)
            .filter(|(k, _)| *u == VR_H && **k == VR_K)
            .map(|(_, s)| time * s)
            .sum();
    }
    OK
}

unsafe extern "C" fn set_real_input_derivatives(
    _c: fmi2Component,
    _vr: *const fmi2ValueReference,
    _n: usize,
    _order: *const fmi2Integer,
    _value: *const fmi2Real,
) -> fmi2Status {
    record("fmi2SetRealInputDerivatives");
    OK
}

unsafe extern "C" fn get_real_output_derivatives(
    _c: fmi2Component,
    _vr: *const fmi2ValueReference,
    n: usize,
    _order: *const fmi2Integer,
    value: *mut fmi2Real,
) -> fmi2Status {
    record("fmi2GetRealOutputDerivatives");
    let k = with_model(|m| m.k);
    for v in unsafe { slice_mut(value, n) } {
        *v = k;
    }
    OK
}

unsafe extern "C" fn do_step(
    _c: fmi2Component,
    current: fmi2Real,
    step: fmi2Real,
    _no_set_prior: fmi2Boolean,
) -> fmi2Status {
    record("fmi2DoStep");
    if let Some(delay) = with_model(|m| m.config.step_delay) {
        std::thread::sleep(delay);
    }
    with_model(|m| {
        let target = current + step;
        if m.config.discard_at.is_some_and(|d| target > d) {
            if m.config.terminate_on_discard {
                m.terminated = true;
                m.last_successful_time = current;
            }
            return DISCARD;
        }
        if let Some(polls) = m.config.pending_polls {
            m.in_flight = Some((target, polls));
            return PENDING;
        }
        m.finish_step(target);
        OK
    })
}

unsafe extern "C" fn cancel_step(_c: fmi2Component) -> fmi2Status {
    record("fmi2CancelStep");
    with_model(|m| m.in_flight = None);
    OK
}

unsafe extern "C" fn get_status(
    _c: fmi2Component,
    kind: fmi2StatusKind,
    value: *mut fmi2Status,
) -> fmi2Status {
    record("fmi2GetStatus");
    if kind != StatusKind::DoStepStatus.to_raw() {
        return DISCARD;
    }
    let status = with_model(|m| match m.in_flight {
        Some((target, 0)) => {
            m.in_flight = None;
            m.finish_step(target);
            OK
        }
        Some((target, remaining)) => {
            m.in_flight = Some((target, remaining - 1));
            PENDING
        }
        None => OK,
    });
    unsafe { *value = status };
    OK
}

unsafe extern "C" fn get_real_status(
    _c: fmi2Component,
    kind: fmi2StatusKind,
    value: *mut fmi2Real,
) -> fmi2Status {
    record("fmi2GetRealStatus");
    if kind != StatusKind::LastSuccessfulTime.to_raw() {
        return DISCARD;
    }
    unsafe { *value = with_model(|m| m.last_successful_time) };
    OK
}

unsafe extern "C" fn get_integer_status(
    _c: fmi2Component,
    _kind: fmi2StatusKind,
    _value: *mut fmi2Integer,
) -> fmi2Status {
    record("fmi2GetIntegerStatus");
    DISCARD
}

unsafe extern "C" fn get_boolean_status(
    _c: fmi2Component,
    kind: fmi2StatusKind,
    value: *mut fmi2Boolean,
) -> fmi2Status {
    record("fmi2GetBooleanStatus");
    if kind != StatusKind::Terminated.to_raw() {
        return DISCARD;
    }
    let terminated = with_model(|m| m.terminated);
    unsafe { *value = if terminated { fmi2True } else { fmi2False } };
    OK
}

unsafe extern "C" fn get_string_status(
    _c: fmi2Component,
    _kind: fmi2StatusKind,
    value: *mut fmi2String,
) -> fmi2Status {
    record("fmi2GetStringStatus");
    unsafe { *value = c"idle".as_ptr() };
    OK
}

/// 只包含公共入口点与 Co-Simulation 入口点的表
pub fn mock_functions() -> Fmi2Functions {
    Fmi2Functions {
        get_types_platform: Some(get_types_platform),
        get_version: Some(get_version),
        set_debug_logging: Some(set_debug_logging),
        instantiate: Some(instantiate),
        free_instance: Some(free_instance),
        setup_experiment: Some(setup_experiment),
        enter_initialization_mode: Some(enter_initialization_mode),
        exit_initialization_mode: Some(exit_initialization_mode),
        terminate: Some(terminate),
        reset: Some(reset),
        get_real: Some(get_real),
        get_integer: Some(get_integer),
        get_boolean: Some(get_boolean),
        get_string: Some(get_string),
        set_real: Some(set_real),
        set_integer: Some(set_integer),
        set_boolean: Some(set_boolean),
        set_string: Some(set_string),
        get_fmu_state: Some(get_fmu_state),
        set_fmu_state: Some(set_fmu_state),
        free_fmu_state: Some(free_fmu_state),
        serialized_fmu_state_size: Some(serialized_fmu_state_size),
        serialize_fmu_state: Some(serialize_fmu_state),
        de_serialize_fmu_state: Some(de_serialize_fmu_state),
        get_directional_derivative: Some(get_directional_derivative),
        set_real_input_derivatives: Some(set_real_input_derivatives),
        get_real_output_derivatives: Some(get_real_output_derivatives),
        do_step: Some(do_step),
        cancel_step: Some(cancel_step),
        get_status: Some(get_status),
        get_real_status: Some(get_real_status),
        get_integer_status: Some(get_integer_status),
        get_boolean_status: Some(get_boolean_status),
        get_string_status: Some(get_string_status),
        ..Fmi2Functions::default()
    }
}

pub fn mock_binding_with_sink(sink: Arc<dyn LogSink>) -> Arc<ModelBinding> {
    ModelBinding::from_functions(mock_functions(), FmuType::CoSimulation, sink)
        .expect("mock binding")
}

pub fn mock_binding() -> Arc<ModelBinding> {
    mock_binding_with_sink(Arc::new(NoopSink))
}

/// 重置模拟模型并实例化
pub fn mock_instance(config: MockConfig) -> ModelInstance {
    reset_mock(config);
    mock_binding()
        .instantiate("mock", "{mock-guid}", None, false, false)
        .expect("instantiate mock")
}

/// 实例化并完成初始化，进入 StepMode
pub fn initialized_instance(config: MockConfig) -> ModelInstance {
    let mut instance = mock_instance(config);
    instance
        .setup_experiment(None, 0.0, Some(1.0))
        .expect("setup experiment");
    instance
        .enter_initialization_mode()
        .expect("enter initialization mode");
    instance
        .exit_initialization_mode()
        .expect("exit initialization mode");
    instance
}

pub const MOCK_DESCRIPTION: &str = r#"
{
    "fmiVersion": "2.0",
    "modelName": "Mock",
    "guid": "{mock-guid}",
    "description": "in-process test model",
    "generationTool": "hand written",
    "coSimulation": {
        "modelIdentifier": "mock",
        "canHandleVariableCommunicationStepSize": true,
        "canGetAndSetFMUstate": true,
        "canSerializeFMUstate": true
    },
    "defaultExperiment": { "startTime": 0.0, "stopTime": 0.1 },
    "modelVariables": [
        { "name": "h", "valueReference": 0, "causality": "output", "real": { "unit": "m" } },
        { "name": "k", "valueReference": 1, "causality": "parameter", "variability": "fixed", "real": { "start": 2.0 } },
        { "name": "counter", "valueReference": 2, "causality": "output", "variability": "discrete", "integer": {} },
        { "name": "even", "valueReference": 3, "causality": "output", "variability": "discrete", "boolean": {} },
        { "name": "label", "valueReference": 4, "causality": "parameter", "variability": "fixed", "string": { "start": "mock" } },
        { "name": "time", "valueReference": 5, "causality": "independent", "real": {} }
    ]
}
"#;

pub fn mock_description() -> ModelDescription {
    ModelDescription::from_json_str(MOCK_DESCRIPTION).expect("parse mock description")
}

/// 把模型日志收集起来
#[derive(Default)]
pub struct CollectingSink {
    pub messages: Mutex<Vec<(String, crate::fmi2::Status, String)>>,
}

impl LogSink for CollectingSink {
    fn log(&self, record: &LogRecord<'_>) {
        self.messages.lock().expect("sink lock").push((
            record.category.to_string(),
            record.status,
            record.message.to_string(),
        ));
    }
}
