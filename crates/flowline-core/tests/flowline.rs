use approx::assert_abs_diff_eq;
use flowline_core::{
    ClampPolicy, Field, FlowlineError, GroundingLineLocator, Mesh, ProfileSet, SimulationConfig, SimulationLoop,
    SimulationState,
};

/// Grounded ice thinning toward a bed that deepens seaward of x = 12,
/// sampled every 0.5 along the flowline.
fn fjord_profile() -> ProfileSet {
    let distance: Vec<f64> = (0..=40).map(|k| 0.5 * k as f64).collect();
    let bedrock = distance.iter().map(|&x| if x < 12.0 { -2.0 } else { 2.0 * (x - 11.0) }).collect();
    let ice: Vec<f64> = distance.iter().map(|&x| (30.0 - 2.0 * x).max(0.5)).collect();
    ProfileSet::new(distance, bedrock, ice.clone(), Some(ice)).unwrap()
}

fn fjord_config() -> SimulationConfig {
    SimulationConfig {
        density_ratio: 0.09,
        viscosity: 1.0e4,
        surface_mass_balance: -0.2,
        time_step: 1.0,
        horizon: 10.0,
        domain_length: 20.0,
        cell_count: 40,
        clamp_policy: ClampPolicy::Relocated,
        ..Default::default()
    }
}

#[test]
fn fjord_run_completes_with_a_tracked_grounding_line() {
    let sim = SimulationLoop::new(fjord_config(), &fjord_profile()).unwrap();
    assert_eq!(sim.mesh().cell_count(), 40);
    assert_abs_diff_eq!(sim.mesh().cell_width(), 0.5);

    let report = sim.run().unwrap();
    assert_eq!(report.steps_completed, 10);
    assert_abs_diff_eq!(report.time, 10.0);
    assert_eq!(report.final_thickness.len(), 40);
    assert!(report.final_thickness.iter().all(|h| h.is_finite() && *h > 0.0));

    for record in &report.history {
        let x = record.grounding_line.x;
        assert!(x > 12.0 && x < 18.0, "step {}: grounding line at {x}", record.step);
    }
    // Net ablation outweighs what the clamp restores.
    for pair in report.history.windows(2) {
        assert!(pair[1].volume < pair[0].volume, "volume rose at step {}", pair[1].step);
    }

    let misfit = report.misfit.expect("target supplied");
    assert!(misfit.rmse > 0.0);
    assert!(misfit.bias < 0.0, "ablation should leave the model thinner than the start");
}

#[test]
fn stopping_early_reports_the_last_committed_state() {
    let mut sim = SimulationLoop::new(fjord_config(), &fjord_profile()).unwrap();
    assert_eq!(sim.run_for(3).unwrap(), 3);
    assert_eq!(sim.state(), SimulationState::Stepping { step: 3 });
    let report = sim.report();
    assert_eq!(report.steps_completed, 3);
    assert_eq!(report.final_thickness, sim.ice().values());
    assert_eq!(&report.mesh, sim.mesh());
}

#[test]
fn report_serializes_to_json() {
    let mut cfg = fjord_config();
    cfg.horizon = 2.0;
    let report = SimulationLoop::new(cfg, &fjord_profile()).unwrap().run().unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["mesh"]["cell_count"], 40);
    assert_eq!(json["history"].as_array().unwrap().len(), 2);
    assert!(json["history"][0]["grounding_line"]["x"].is_number());
    assert!(json["misfit"]["rmse"].is_number());
}

#[test]
fn five_cell_example_grounded_then_stepped_bed() {
    let mesh = Mesh::new(0.0, 1.0, 5).unwrap();
    let locator = GroundingLineLocator::new(0.09);

    let ice = Field::new("ice", mesh, vec![10.0, 8.0, 0.2, 0.1, 0.05]).unwrap();
    let bed = Field::new("bedrock", mesh, vec![-5.0; 5]).unwrap();
    assert!(matches!(locator.locate(&ice, &bed), Err(FlowlineError::NoGroundingLineFound)));

    let ice = Field::new("ice", mesh, vec![10.0, 8.0, 5.0, 2.0, 0.1]).unwrap();
    let bed = Field::new("bedrock", mesh, vec![-5.0, -5.0, -5.0, -5.0, 50.0]).unwrap();
    let gl = locator.locate(&ice, &bed).unwrap();
    assert_eq!(gl.index, 4);
    assert!(gl.x > mesh.center(3) && gl.x < mesh.center(4));
}

#[test]
fn entirely_grounded_profile_fails_the_first_step() {
    let profile = ProfileSet::new(vec![0.0, 20.0], vec![-2.0, -2.0], vec![100.0, 100.0], None).unwrap();
    let mut sim = SimulationLoop::new(fjord_config(), &profile).unwrap();
    let before = sim.ice().clone();
    let failure = sim.advance().unwrap_err();
    assert_eq!(failure.step, 0);
    assert_eq!(failure.last_valid, before);
    assert_eq!(sim.state(), SimulationState::Failed { step: 0 });
}
