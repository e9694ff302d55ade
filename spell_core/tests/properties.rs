//! Property tests for aura bookkeeping, modifier resolution and periodic ticks

use proptest::prelude::*;
use spell_core::prelude::*;
use std::time::Duration;

fn dummy_sim() -> (Simulation, UnitId, UnitId) {
    let mut sim = Simulation::new(42);
    let caster = sim.add_player("Caster", StatSheet::new().with(Stat::SpellPower, 100.0), 1000.0);
    let target = sim.add_enemy("Dummy", 1_000_000.0);
    (sim, caster, target)
}

#[derive(Debug, Clone, Copy)]
enum AuraOp {
    Activate,
    Deactivate,
    AddStack,
    RemoveStack,
    Wait(u64),
}

fn aura_op() -> impl Strategy<Value = AuraOp> {
    prop_oneof![
        Just(AuraOp::Activate),
        Just(AuraOp::Deactivate),
        Just(AuraOp::AddStack),
        Just(AuraOp::RemoveStack),
        (1u64..8_000).prop_map(AuraOp::Wait),
    ]
}

proptest! {
    #[test]
    fn stacks_clamp_to_max(max in 1u32..10, adds in 0usize..25) {
        let (mut sim, caster, _) = dummy_sim();
        let aura = sim
            .register_aura(caster, AuraConfig::new("Stacking", AuraDuration::from_secs_f64(30.0)).with_max_stacks(max))
            .unwrap();
        for _ in 0..adds {
            sim.add_stack(aura);
        }
        let state = sim.aura(aura).unwrap();
        prop_assert_eq!(state.stacks(), (adds as u32).min(max));
        prop_assert_eq!(state.is_active(), adds > 0);
    }

    #[test]
    fn gains_balance_expirations(ops in prop::collection::vec(aura_op(), 0..40)) {
        let (mut sim, caster, _) = dummy_sim();
        let aura = sim
            .register_aura(caster, AuraConfig::new("Buff", AuraDuration::from_secs_f64(5.0)).with_max_stacks(3))
            .unwrap();
        for op in ops {
            match op {
                AuraOp::Activate => sim.activate_aura(aura),
                AuraOp::Deactivate => {
                    sim.deactivate_aura(aura);
                }
                AuraOp::AddStack => sim.add_stack(aura),
                AuraOp::RemoveStack => sim.remove_stack(aura),
                AuraOp::Wait(ms) => sim.advance(Duration::from_millis(ms)),
            }
            let state = sim.aura(aura).unwrap();
            let open = if state.is_active() { 1 } else { 0 };
            prop_assert_eq!(state.gains(), state.expirations() + open);
        }
        sim.finish();
        let state = sim.aura(aura).unwrap();
        prop_assert_eq!(state.gains(), state.expirations());
        prop_assert_eq!(state.stacks(), 0);
    }

    #[test]
    fn modifier_registration_order_is_irrelevant(
        order in Just(vec![0usize, 1, 2, 3, 4]).prop_shuffle()
    ) {
        let configs = [
            ModifierConfig::new("Flat", ModTarget::Damage, ModKind::FlatAdd, 10.0),
            ModifierConfig::new("Add A", ModTarget::Damage, ModKind::PercentAdd, 0.1),
            ModifierConfig::new("Add B", ModTarget::Damage, ModKind::PercentAdd, 0.1),
            ModifierConfig::new("Mult", ModTarget::Damage, ModKind::PercentMultiply, 0.1),
            ModifierConfig::new("Other", ModTarget::Healing, ModKind::PercentMultiply, 3.0),
        ];
        let (mut sim, caster, target) = dummy_sim();
        for i in order {
            sim.add_static_modifier(caster, configs[i].clone()).unwrap();
        }
        let bolt = sim
            .register_spell(
                caster,
                SpellConfig::new(ActionId::new(133), "Fireball", SpellSchool::Fire).with_damage(100.0, 100.0),
            )
            .unwrap();
        sim.cast(bolt, target).unwrap();
        // (100 + 10) × 1.2 × 1.1
        let taken = sim.unit(target).unwrap().damage_taken;
        prop_assert!((taken - 145.2).abs() < 1e-9, "damage {}", taken);
    }

    #[test]
    fn periodic_effect_ticks_exactly_n_times(ticks in 1u32..12, tick_ms in 500u64..5_000) {
        let (mut sim, caster, target) = dummy_sim();
        let tick_length = Duration::from_millis(tick_ms);
        let spell = sim
            .register_spell(
                caster,
                SpellConfig::new(ActionId::new(589), "Shadow Word: Pain", SpellSchool::Shadow)
                    .with_flags(SpellFlags::PURE_DOT)
                    .with_dot(DotConfig::new(ticks, tick_length).with_tick(10.0, 0.0)),
            )
            .unwrap();
        sim.apply_dot(spell, target);
        sim.run_until(tick_length * (ticks + 2));

        prop_assert!(!sim.is_dot_active(spell, target));
        prop_assert_eq!(sim.spell(spell).unwrap().metrics.ticks, ticks as u64);
        let taken = sim.unit(target).unwrap().damage_taken;
        prop_assert!((taken - 10.0 * ticks as f64).abs() < 1e-9);
    }
}
