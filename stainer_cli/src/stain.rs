//! `stainer run`: hardware assembly and the real run.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use stainer_config::Config;
use stainer_core::{MachineCfg, RunReport};

use crate::cli::{CliSafety, LAST_SAFETY, RtOpts};
use crate::rt::setup_rt_once;

/// Claim the GPIO pins, run every pass and halt. `shutdown` ends the halt
/// blink so the process can exit and release the pins.
pub fn run_machine(
    cfg: &Config,
    rt: &RtOpts,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<RunReport> {
    let machine_cfg = MachineCfg::from(cfg);
    let _ = LAST_SAFETY.set(CliSafety {
        switch_wait_ms: machine_cfg.safety.switch_wait_ms,
    });
    setup_rt_once(rt);
    run_on_gpio(cfg, machine_cfg, shutdown)
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn run_on_gpio(
    cfg: &Config,
    machine_cfg: MachineCfg,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<RunReport> {
    use eyre::WrapErr;
    use stainer_core::{BlinkLimit, Machine};
    use stainer_hardware::InputBias;
    use stainer_hardware::gpio::{GpioIo, attach_pulse_counter};
    use stainer_traits::StepCounter;

    let bias = InputBias::for_active_low(machine_cfg.pins.limits_active_low);
    let io = GpioIo::new(&machine_cfg.input_pins(), bias, &machine_cfg.output_pins())
        .wrap_err("open gpio pins")?;
    let counter = StepCounter::new();
    // Keep the pulse pin alive for the whole run; dropping it detaches the
    // interrupt.
    let _pulse_pin = match cfg.axes.vertical.pulse_in {
        Some(pin) => Some(
            attach_pulse_counter(pin, counter.clone())
                .wrap_err_with(|| format!("attach pulse counter on pin {pin}"))?,
        ),
        None => None,
    };
    let mut machine = Machine::builder()
        .with_io(io)
        .with_config(machine_cfg)
        .with_step_counter(counter)
        .build()?;
    tracing::info!("machine ready, waiting for operator");
    machine.run(&BlinkLimit::UntilFlag(shutdown))
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn run_on_gpio(
    _cfg: &Config,
    _machine_cfg: MachineCfg,
    _shutdown: Arc<AtomicBool>,
) -> eyre::Result<RunReport> {
    eyre::bail!(
        "no GPIO backend in this build; rebuild with `--features hardware` on Linux or use `stainer simulate`"
    )
}
