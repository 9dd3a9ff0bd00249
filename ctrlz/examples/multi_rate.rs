//! Two-joint arm driven at three rates.
//!
//! - main (500 Hz): simulated plant, PD torque loop, action switch
//! - policy (50 Hz): produces a standing and a walking joint target
//! - logger (100 Hz): records the arm state to CSV
//!
//! Run with `RUST_LOG=info cargo run -p ctrlz --example multi_rate`.

use ctrlz::prelude::*;

channels! {
    pub ArmBus {
        TargetMotorPosition: [f32; 2],
        TargetMotorVelocity: [f32; 2],
        CurrentMotorPosition: [f32; 2],
        CurrentMotorVelocity: [f32; 2],
        TargetMotorTorque: [f32; 2],
        StandAction: [f32; 2],
        WalkAction: [f32; 2],
    }
}

impl MotorPdChannels<2> for ArmBus {
    type TargetPosition = TargetMotorPosition;
    type TargetVelocity = TargetMotorVelocity;
    type CurrentPosition = CurrentMotorPosition;
    type CurrentVelocity = CurrentMotorVelocity;
    type TargetTorque = TargetMotorTorque;
}

/// Unit-inertia joints with light damping, integrated with explicit Euler
fn plant(handle: &SchedulerHandle<ArmBus>, _cycle: &CycleInfo<'_>) {
    let dt = handle.dt() as f32;
    let (tau, _) = handle.get_data::<TargetMotorTorque>();
    let (mut q, _) = handle.get_data::<CurrentMotorPosition>();
    let (mut qd, _) = handle.get_data::<CurrentMotorVelocity>();
    for i in 0..2 {
        qd[i] += (tau[i] - 0.1 * qd[i]) * dt;
        q[i] += qd[i] * dt;
    }
    handle.set_data::<CurrentMotorPosition>(q);
    handle.set_data::<CurrentMotorVelocity>(qd);
}

fn policy(handle: &SchedulerHandle<ArmBus>, cycle: &CycleInfo<'_>) {
    let t = cycle.tick as f32 * handle.dt() as f32;
    handle.set_data::<StandAction>([0.0, 0.3]);
    handle.set_data::<WalkAction>([0.4 * (2.0 * t).sin(), 0.3 + 0.2 * (2.0 * t).cos()]);
}

fn main() -> AnyResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = SchedulerConfig::standard().with_dt(0.002);
    let mut scheduler = Scheduler::<ArmBus>::with_name("arm", config)?;

    scheduler.create_task_list("main", 1, true)?;
    scheduler.create_task_list("policy", 10, false)?;
    scheduler.create_task_list("logger", 5, false)?;

    scheduler.add_worker("main", CallbackWorker::new("plant", scheduler.handle(), plant))?;
    scheduler.spawn_worker::<MotorPdWorker<ArmBus, 2>>(
        "main",
        &json!({"Kp": [40.0, 40.0], "Kd": [4.0, 4.0]}),
    )?;
    let switch = scheduler
        .create_worker::<ActionSwitchWorker<ArmBus, TargetMotorPosition>>(&json!({
            "SwitchIntervalTime": 0.1
        }))?
        .add_source::<StandAction>()
        .add_source::<WalkAction>();
    let control = switch.control();
    scheduler.add_worker("main", switch)?;

    scheduler.add_worker("policy", CallbackWorker::new("policy", scheduler.handle(), policy))?;

    let log_dir = std::env::temp_dir().join("ctrlz-multi-rate");
    scheduler.spawn_worker::<CsvLoggerWorker<ArmBus>>(
        "logger",
        &json!({
            "LogPath": log_dir,
            "WriteBackFrequency": 100,
            "Channels": ["TargetMotorPosition", "CurrentMotorPosition", "TargetMotorTorque"]
        }),
    )?;

    scheduler.install_signal_handler();
    scheduler.start()?;
    scheduler.enable_task_list("policy");
    scheduler.enable_task_list("logger");

    control.switch_to("StandAction", Some(0.0));
    scheduler.spin_for(Duration::from_secs(1))?;

    // Another thread could call this from an operator console
    control.switch_to("WalkAction", None);
    scheduler.spin_for(Duration::from_secs(2))?;

    let (q, tick) = scheduler.get_data::<CurrentMotorPosition>();
    log::info!("joint position {:?} at tick {}", q, tick);
    for stats in scheduler.handle().all_task_stats() {
        log::info!(
            "task {:<8} cycles={} overruns={}",
            stats.name,
            stats.cycles,
            stats.overruns
        );
    }

    scheduler.stop();
    log::info!("CSV written under {}", log_dir.display());
    Ok(())
}
