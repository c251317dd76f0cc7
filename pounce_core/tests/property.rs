use pounce_core::{PhaseCfg, PhaseSequencer};
use pounce_traits::Phase;
use proptest::prelude::*;

prop_compose! {
    // Valid phase configuration: time boundaries ordered by construction.
    fn cfg_strategy()(
        t_begin in 0.0f64..1.0,
        settle_span in 1e-3f64..1.0,
        end_span in 1e-3f64..1.0,
        pd_begin in 0.1f64..5.0,
        pd_lead in 0.0f64..2.0,
        feedforward_torque in 0.05f64..3.0,
        kp_scale in 0.0f64..2.0,
        kd_scale in 0.0f64..2.0,
        maximum_torque in 0.05f64..3.0,
        reset_torque in 0.0f64..1.0,
    ) -> PhaseCfg {
        PhaseCfg {
            t_begin,
            t_reset: t_begin + settle_span,
            pd_begin,
            pd_target: pd_begin + pd_lead,
            feedforward_torque,
            kp_scale,
            kd_scale,
            maximum_torque,
            reset_torque,
            termination_time: t_begin + settle_span + end_span,
        }
    }
}

prop_compose! {
    // Cumulative increments give a trace where both elapsed time and
    // position never decrease, which is the regime a one-way push produces.
    fn trace_strategy()(
        increments in prop::collection::vec((0.0f64..0.05, 0.0f64..0.2), 10..300),
    ) -> Vec<(f64, f64)> {
        let mut elapsed = 0.0;
        let mut position = 0.0;
        increments
            .into_iter()
            .map(|(dt, dp)| {
                elapsed += dt;
                position += dp;
                (elapsed, position)
            })
            .collect()
    }
}

proptest! {
    #[test]
    fn phases_never_regress_on_forward_traces(cfg in cfg_strategy(), trace in trace_strategy()) {
        let mut sequencer = PhaseSequencer::new(cfg);
        let mut previous: Option<Phase> = None;

        for (elapsed, position) in trace {
            let (phase, cmd) = sequencer.next_command(elapsed, position);

            if let Some(prev) = previous {
                prop_assert!(prev <= phase, "phase regressed: {:?} -> {:?}", prev, phase);
            }
            previous = Some(phase);

            // Every command queries state; the torque cap and the command
            // shape are fully determined by the phase.
            prop_assert!(cmd.query);
            match phase {
                Phase::HoldZero => {
                    prop_assert_eq!(cmd.position, Some(0.0));
                    prop_assert_eq!(cmd.maximum_torque, cfg.maximum_torque);
                }
                Phase::Push => {
                    prop_assert!(cmd.position.is_none());
                    prop_assert_eq!(cmd.kp_scale, 0.0);
                    prop_assert_eq!(cmd.kd_scale, 0.0);
                    prop_assert_eq!(cmd.feedforward_torque, Some(cfg.feedforward_torque));
                    prop_assert_eq!(cmd.maximum_torque, cfg.maximum_torque);
                }
                Phase::Settle => {
                    prop_assert_eq!(cmd.position, Some(cfg.pd_target));
                    prop_assert_eq!(cmd.maximum_torque, cfg.maximum_torque);
                }
                Phase::Reset => {
                    prop_assert_eq!(cmd.position, Some(0.0));
                    prop_assert_eq!(cmd.maximum_torque, cfg.reset_torque);
                }
            }
        }
    }
}
