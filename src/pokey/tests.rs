use super::*;

fn pal_pokey() -> Pokey {
    Pokey::new(50)
}

#[test]
fn polynomial_counters_have_maximal_periods() {
    let mut pokey = pal_pokey();
    let seeds = (pokey.poly4, pokey.poly5, pokey.poly9, pokey.poly17);

    for steps in 1..=15u32 {
        pokey.step_polys();
        if steps < 15 {
            assert_ne!(pokey.poly4, seeds.0, "poly4 repeated after {steps} steps");
        }
    }
    assert_eq!(pokey.poly4, seeds.0);

    let mut pokey = pal_pokey();
    for _ in 0..31 {
        pokey.step_polys();
    }
    assert_eq!(pokey.poly5, seeds.1);

    let mut pokey = pal_pokey();
    for _ in 0..511 {
        pokey.step_polys();
    }
    assert_eq!(pokey.poly9, seeds.2);

    let mut pokey = pal_pokey();
    for _ in 0..131_071 {
        pokey.step_polys();
    }
    assert_eq!(pokey.poly17, seeds.3);
}

#[test]
fn random_register_follows_the_active_long_poly() {
    let mut pokey = pal_pokey();
    let value = pokey.read(RANDOM);
    assert_eq!(value, (pokey.poly17 ^ (pokey.poly17 >> 1)) as u8);

    pokey.write(AUDCTL, AUDCTL_POLY9);
    let value = pokey.read(RANDOM);
    assert_eq!(value, (pokey.poly9 ^ (pokey.poly9 >> 1)) as u8);
}

#[test]
fn frame_produces_exact_sample_budget() {
    for (rate, lines) in [(50u32, 312u16), (60, 262)] {
        let mut pokey = Pokey::new(rate);
        let expected = (SAMPLE_RATE / rate) as usize;
        for scanline in 0..lines {
            pokey.fill_scanline(scanline, lines);
        }
        let samples = pokey.take_frame_samples();
        assert_eq!(samples.len(), expected, "{rate} Hz frame sample count");

        // The next frame starts from zero again.
        for scanline in 0..lines {
            pokey.fill_scanline(scanline, lines);
        }
        assert_eq!(pokey.take_frame_samples().len(), expected);
    }
}

#[test]
fn volume_only_mode_emits_flat_dac_level() {
    let mut pokey = pal_pokey();
    pokey.write(AUDC1, 0x1F); // volume-only, volume 15
    for scanline in 0..312 {
        pokey.fill_scanline(scanline, 312);
    }
    let samples = pokey.take_frame_samples();
    assert!(samples.iter().all(|&s| s == 15 * 2048));
}

#[test]
fn silent_channels_output_nothing() {
    let mut pokey = pal_pokey();
    pokey.write(AUDF1, 0x10);
    pokey.write(AUDC1, 0xA0); // pure tone, volume 0
    for scanline in 0..312 {
        pokey.fill_scanline(scanline, 312);
    }
    assert!(pokey.take_frame_samples().iter().all(|&s| s == 0));
}

#[test]
fn joined_channels_use_sixteen_bit_frequency() {
    let mut pokey = pal_pokey();
    pokey.write(AUDF1, 0x34);
    pokey.write(AUDF2, 0x12);
    pokey.write(AUDCTL, AUDCTL_CH1_CH2 | AUDCTL_CH1_179);
    assert_eq!(pokey.channels[0].period, 0x1234 + 1);
    assert_eq!(pokey.channels[1].period, 0);

    pokey.write(AUDCTL, AUDCTL_CH1_CH2);
    assert_eq!(pokey.channels[0].period, (0x1234 + 1) * 28);
}

#[test]
fn fifteen_khz_mode_stretches_base_periods() {
    let mut pokey = pal_pokey();
    pokey.write(AUDF1, 9);
    assert_eq!(pokey.channels[0].period, 10 * 28);
    pokey.write(AUDCTL, AUDCTL_15KHZ);
    assert_eq!(pokey.channels[0].period, 10 * 114);
}

#[test]
fn fast_clock_channel_uses_audf_plus_four() {
    let mut pokey = pal_pokey();
    pokey.write(AUDF1, 9);
    pokey.write(AUDCTL, AUDCTL_CH1_179);
    assert_eq!(pokey.channels[0].period, 13);
}

#[test]
fn key_press_latches_code_and_raises_irq() {
    let mut pokey = pal_pokey();
    pokey.write(IRQEN, IRQ_KEYPRESS);
    assert!(!pokey.check_irq());

    pokey.set_key(0x3F, true);
    assert_eq!(pokey.read(KBCODE), 0x3F);
    assert_eq!(pokey.read(IRQST) & IRQ_KEYPRESS, 0);
    assert_eq!(pokey.read(SKSTAT) & SKSTAT_KEYDOWN, 0);
    assert!(pokey.check_irq());

    // Release clears the key-down line but the IRQ stays asserted until
    // acknowledged.
    pokey.set_key(0x3F, false);
    assert_ne!(pokey.read(SKSTAT) & SKSTAT_KEYDOWN, 0);
    assert!(pokey.check_irq());

    pokey.write(IRQEN, 0);
    assert!(!pokey.check_irq());
    assert_ne!(pokey.read(IRQST) & IRQ_KEYPRESS, 0);
}

#[test]
fn key_press_without_enable_does_not_assert() {
    let mut pokey = pal_pokey();
    pokey.set_key(0x21, true);
    assert_eq!(pokey.read(KBCODE), 0x21);
    assert!(!pokey.check_irq());
}

#[test]
fn break_key_uses_its_own_source() {
    let mut pokey = pal_pokey();
    pokey.write(IRQEN, IRQ_BREAK);
    pokey.set_break_key(true);
    assert_eq!(pokey.read(IRQST) & IRQ_BREAK, 0);
    assert!(pokey.check_irq());
    pokey.acknowledge_irq(IRQ_BREAK);
    assert!(!pokey.check_irq());
}

#[test]
fn skrest_restores_skstat() {
    let mut pokey = pal_pokey();
    pokey.set_key(0x00, true);
    assert_eq!(pokey.read(SKSTAT) & SKSTAT_KEYDOWN, 0);
    pokey.write(SKREST, 0xFF);
    assert_eq!(pokey.read(SKSTAT), 0xFF);
}

#[test]
fn skctl_zero_resets_the_chip() {
    let mut pokey = pal_pokey();
    pokey.write(IRQEN, IRQ_KEYPRESS);
    pokey.set_key(0x12, true);
    assert!(pokey.check_irq());
    pokey.write(SKCTL, 0);
    assert!(!pokey.check_irq());
    assert_eq!(pokey.read(KBCODE), 0xFF);
    // The sample budget survives a chip reset.
    assert_eq!(pokey.samples_per_frame(), (SAMPLE_RATE / 50) as u16);
}

#[test]
fn paddles_report_injected_values() {
    let mut pokey = pal_pokey();
    assert_eq!(pokey.read(0x03), 228);
    pokey.set_paddle(3, 17);
    assert_eq!(pokey.read(0x03), 17);
    pokey.set_paddle(9, 1); // out of range: ignored
}

#[test]
fn last_write_wins_on_frequency_registers() {
    let mut pokey = pal_pokey();
    for value in [0x10, 0x20, 0x30u8] {
        pokey.write(AUDF1, value);
    }
    assert_eq!(pokey.channels[0].audf, 0x30);
    assert_eq!(pokey.channels[0].period, (0x30 + 1) * 28);
}
