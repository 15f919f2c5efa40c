use super::*;

/// Applied car: pipe and cylinder at atmosphere, reservoir holding full vacuum
fn applied_brake(env: &Environment) -> VacuumBrake {
    let mut brake = VacuumBrake::default();
    brake.reset_released(&BrakeController::auto_release(), env);
    let atm = env.atmospheric_psia();
    brake.state.pipe_psia = atm;
    brake.state.cylinder_psia = atm;
    brake
}

#[test]
fn test_cylinder_lags_linear_pipe_release() {
    let env = Environment::default();
    let mut brake = applied_brake(&env);
    let atm = env.atmospheric_psia();
    let floor = brake.vacuum_floor_psia(atm);
    let controller = BrakeController::auto_release();
    let dt = 0.1;
    let max_step = brake.release_rate_psips * dt;
    let vr = brake.volume_ratio();

    // pipe pressure falls linearly from atmosphere to full vacuum over 10 s
    for step in 1..=150 {
        let t = step as f64 * dt;
        let pipe = (atm - (atm - floor) * t / 10.0).max(floor);
        brake.set_pipe_pressure(si::Pressure::new::<si::psi>(pipe));
        let cyl_before = brake.state.cylinder_psia;
        brake.update(dt * uc::S, &controller, &env, false).unwrap();
        let cyl = brake.state.cylinder_psia;
        // never leads the pipe
        assert!(cyl >= brake.state.pipe_psia - 1e-12, "step {step}");
        // never faster than the release rate
        assert!(cyl_before - cyl <= max_step + 1e-12, "step {step}");
        assert!(cyl <= cyl_before + 1e-12, "step {step}");
        // never more than the move that equalizes pipe and cylinder volumes
        let equalizing_step = (pipe - cyl_before).abs() / (1.0 + vr);
        assert!((cyl - cyl_before).abs() <= equalizing_step + 1e-12, "step {step}");
    }
    // the lag is bounded: the cylinder has caught up once the pipe settles
    assert!(brake.state.cylinder_psia - floor < 1.0);
}

#[test]
fn test_pressures_stay_within_bounds() {
    let env = Environment {
        altitude: 800.0 * uc::M,
        ..Default::default()
    };
    let atm = env.atmospheric_psia();
    let controllers = [
        BrakeController::auto_release(),
        BrakeController::auto_full_service(),
        BrakeController::Automatic {
            pipe_target: si::Pressure::new::<si::psi>(atm - 4.0),
        },
        BrakeController::Straight(StraightBrakeState::Apply),
        BrakeController::Straight(StraightBrakeState::Emergency),
        BrakeController::Straight(StraightBrakeState::Release),
        BrakeController::Straight(StraightBrakeState::Lap),
    ];
    let mut pipe = BrakePipe::default();
    let mut cars = vec![
        VacuumBrake::default(),
        VacuumBrake {
            kind: BrakeSystemKind::Straight {
                has_aux_reservoir: true,
            },
            ..Default::default()
        },
        VacuumBrake {
            kind: BrakeSystemKind::Straight {
                has_aux_reservoir: false,
            },
            ..Default::default()
        },
    ];
    let floor = cars[0].vacuum_floor_psia(atm);
    // deterministic scramble of controller and step size
    let mut seed: u64 = 12_345;
    for _ in 0..2_000 {
        seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        let controller = controllers[(seed >> 33) as usize % controllers.len()];
        let dt = ((seed >> 20) % 5) as f64 * 0.1 * uc::S;
        for _ in 0..10 {
            pipe.update(dt, &controller, &env, &mut cars, &[]).unwrap();
            for car in &cars {
                let cyl = car.state.cylinder_psia;
                assert!(cyl >= floor && cyl <= atm, "{cyl} outside [{floor}, {atm}]");
                assert!(car.brake_force() >= si::Force::ZERO);
                assert!(car.brake_force() <= car.max_brake_force);
            }
        }
    }
}

#[test]
fn test_sound_events_follow_application() {
    let env = Environment::default();
    let mut brake = VacuumBrake::default();
    let apply = BrakeController::auto_full_service();
    let mut events = vec![];
    for _ in 0..400 {
        brake.drive_pipe(0.1 * uc::S, &apply, &env);
        events.extend(brake.update(0.1 * uc::S, &apply, &env, false).unwrap());
    }
    assert_eq!(
        events,
        vec![
            BrakeSoundEvent::PipePressureIncrease,
            BrakeSoundEvent::CylinderPressureIncrease,
            BrakeSoundEvent::PipePressureStoppedChanging,
            BrakeSoundEvent::CylinderPressureStoppedChanging,
        ]
    );
}
