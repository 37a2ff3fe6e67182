//! Result printing for each command, human or JSON on stdout.

use serde_json::{Value, json};
use stainer_core::{
    Axis, AxisDrive, LimitSwitch, MachineCfg, RunReport, SprayThresholds, select_spray,
};

use crate::simulate::SimSummary;

fn run_json(report: &RunReport) -> Value {
    let passes: Vec<Value> = report
        .passes
        .iter()
        .map(|p| {
            json!({
                "home": p.home.name(),
                "strokes": p.strokes.iter().map(|s| json!({
                    "axis": s.axis.name(),
                    "endpoint": s.endpoint.name(),
                    "spray": s.spray.name(),
                    "count": s.count,
                })).collect::<Vec<_>>(),
            })
        })
        .collect();
    json!({
        "passes": passes,
        "counters": {
            "horizontal": report.counters.get(Axis::Horizontal),
            "vertical": report.counters.get(Axis::Vertical),
        },
        "elapsed_ms": report.elapsed.as_millis() as u64,
    })
}

fn print_passes(report: &RunReport) {
    for (i, pass) in report.passes.iter().enumerate() {
        println!(
            "pass {} (home {}): {} strokes",
            i + 1,
            pass.home,
            pass.strokes.len()
        );
        for s in &pass.strokes {
            println!(
                "  stroke {}: {} toward {}, spray {}",
                s.count,
                s.axis,
                s.endpoint.extreme_name(),
                s.spray
            );
        }
    }
}

fn total_strokes(report: &RunReport) -> usize {
    report.passes.iter().map(|p| p.strokes.len()).sum()
}

pub fn print_run(report: &RunReport, json: bool) {
    if json {
        println!("{}", run_json(report));
        return;
    }
    print_passes(report);
    println!(
        "run complete: {} strokes in {:.1} s",
        total_strokes(report),
        report.elapsed.as_secs_f64()
    );
}

pub fn print_simulation(summary: &SimSummary, json: bool) {
    if json {
        let mut v = run_json(&summary.report);
        v["simulation"] = json!({
            "sim_ms": summary.sim_time.as_millis() as u64,
            "writes": summary.writes,
            "pending_taps": summary.pending_taps,
            "horizontal_position": summary.horizontal_position,
            "vertical_position": summary.vertical_position,
        });
        println!("{v}");
        return;
    }
    print_passes(&summary.report);
    println!(
        "simulation complete: {} strokes, simulated time {:.1} s, {} output writes",
        total_strokes(&summary.report),
        summary.sim_time.as_secs_f64(),
        summary.writes
    );
    println!(
        "head at horizontal {} / vertical {}",
        summary.horizontal_position, summary.vertical_position
    );
    if summary.pending_taps > 0 {
        println!("{} operator taps were never consumed", summary.pending_taps);
    }
}

fn drive_rows(name: &str, drive: &AxisDrive, rows: &mut Vec<(String, u8)>) {
    match drive {
        AxisDrive::Stepper { drivers, .. } => {
            for (i, d) in drivers.iter().enumerate() {
                rows.push((format!("{name}[{i}].enable"), d.enable));
                rows.push((format!("{name}[{i}].dir"), d.dir));
                rows.push((format!("{name}[{i}].step"), d.step));
            }
        }
        AxisDrive::Relay { up, down, .. } => {
            rows.push((format!("{name}.up_relay"), *up));
            rows.push((format!("{name}.down_relay"), *down));
        }
    }
}

pub fn print_check(cfg: &MachineCfg, json: bool) {
    let mut rows: Vec<(String, u8)> = LimitSwitch::ALL
        .iter()
        .map(|s| (format!("{}_limit", s.name()), cfg.pins.limit(*s)))
        .collect();
    rows.push(("top_spray".into(), cfg.pins.top_spray));
    rows.push(("bottom_spray".into(), cfg.pins.bottom_spray));
    rows.push(("status_led".into(), cfg.pins.status_led));
    drive_rows("horizontal", &cfg.horizontal.drive, &mut rows);
    drive_rows("vertical", &cfg.vertical.drive, &mut rows);
    if let Some(ind) = &cfg.induction {
        rows.push(("induction.power".into(), ind.power));
        rows.push(("induction.horizontal_select".into(), ind.horizontal_select));
        rows.push(("induction.vertical_select".into(), ind.vertical_select));
    }

    if json {
        let pins: serde_json::Map<String, Value> =
            rows.into_iter().map(|(k, p)| (k, json!(p))).collect();
        let passes: Vec<&str> = cfg.run.passes.iter().map(|d| d.name()).collect();
        println!("{}", json!({ "ok": true, "pins": pins, "passes": passes }));
        return;
    }
    println!("config OK");
    for (role, pin) in rows {
        println!("  {role:<28} {pin}");
    }
    let passes: Vec<&str> = cfg.run.passes.iter().map(|d| d.name()).collect();
    println!("  passes (home): {}", passes.join(", "));
}

pub fn print_spray_plan(t: &SprayThresholds, strokes: u32, json: bool) {
    let plan: Vec<_> = (0..strokes).map(|n| select_spray(n, t)).collect();
    if json {
        let names: Vec<&str> = plan.iter().map(|s| s.name()).collect();
        println!("{}", json!({ "min": t.min, "max": t.max, "plan": names }));
        return;
    }
    for (n, spray) in plan.iter().enumerate() {
        println!("stroke {}: {spray}", n + 1);
    }
}
