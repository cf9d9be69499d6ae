use super::*;
use crate::error::AtariError;

const PIA_PORTB: u16 = 0xD301;
const PIA_PACTL: u16 = 0xD302;
const PIA_PBCTL: u16 = 0xD303;
const PIA_PORTA: u16 = 0xD300;

/// ROMs with recognisable contents: OS bytes derive from their offset, the
/// BASIC image from a different mix, and the reset vector points into ROM.
fn patterned_roms() -> (Vec<u8>, Vec<u8>) {
    let mut os_rom: Vec<u8> = (0..OS_ROM_SIZE)
        .map(|i| (i as u8) ^ ((i >> 8) as u8))
        .collect();
    os_rom[OS_ROM_RESET_VECTOR] = 0x34;
    os_rom[OS_ROM_RESET_VECTOR + 1] = 0xE1;
    let basic_rom: Vec<u8> = (0..BASIC_ROM_SIZE).map(|i| 0xB0 ^ (i as u8)).collect();
    (os_rom, basic_rom)
}

fn test_bus() -> Bus {
    let (os_rom, basic_rom) = patterned_roms();
    Bus::new(os_rom, basic_rom, VideoSystem::Pal).unwrap()
}

/// Select the PIA data registers and make every port B bit writable.
fn open_port_b(bus: &mut Bus) {
    bus.write(PIA_PBCTL, 0x00);
    bus.write(PIA_PORTB, 0xFF); // DDR: all outputs
    bus.write(PIA_PBCTL, 0x04);
}

#[test]
fn ram_is_exactly_64k() {
    let bus = test_bus();
    assert_eq!(bus.ram().len(), 65_536);
}

#[test]
fn rom_construction_validates_sizes_and_vector() {
    let (os_rom, basic_rom) = patterned_roms();

    let err = Bus::new(vec![0; 123], basic_rom.clone(), VideoSystem::Pal).unwrap_err();
    assert!(matches!(err, AtariError::RomSize { rom: "OS", .. }));

    let err = Bus::new(os_rom.clone(), vec![0; 999], VideoSystem::Pal).unwrap_err();
    assert!(matches!(err, AtariError::RomSize { rom: "BASIC", .. }));

    let mut bad_vector = os_rom;
    bad_vector[OS_ROM_RESET_VECTOR] = 0x00;
    bad_vector[OS_ROM_RESET_VECTOR + 1] = 0x40;
    let err = Bus::new(bad_vector, basic_rom, VideoSystem::Pal).unwrap_err();
    assert!(matches!(err, AtariError::RomResetVector { vector: 0x4000 }));
}

#[test]
fn visible_rom_regions_read_bit_for_bit() {
    let (os_rom, basic_rom) = patterned_roms();
    let mut bus = test_bus();

    for addr in [0xC000u16, 0xC123, 0xCFFF, 0xD800, 0xE000, 0xFFFF] {
        assert_eq!(bus.read(addr), os_rom[(addr - 0xC000) as usize], "${addr:04X}");
    }
    for addr in [0xA000u16, 0xA5A5, 0xBFFF] {
        assert_eq!(bus.read(addr), basic_rom[(addr - 0xA000) as usize], "${addr:04X}");
    }
}

#[test]
fn write_under_rom_lands_in_ram() {
    let (os_rom, _) = patterned_roms();
    let mut bus = test_bus();

    bus.write(0xC100, 0x5A);
    assert_eq!(bus.read(0xC100), os_rom[0x0100], "ROM still visible");

    open_port_b(&mut bus);
    bus.write(PIA_PORTB, 0xFF); // bit 0 set: OS ROM hidden
    assert_eq!(bus.read(0xC100), 0x5A, "RAM under ROM holds the write");
}

#[test]
fn port_b_banking_switches_os_rom() {
    // Scenario: DDR all outputs, $FE maps the OS in, $FF maps it out.
    let (os_rom, _) = patterned_roms();
    let mut bus = test_bus();
    open_port_b(&mut bus);

    bus.write(PIA_PORTB, 0xFE);
    assert!(bus.os_rom_visible());
    assert_eq!(bus.read(0xFFFC), os_rom[OS_ROM_RESET_VECTOR]);

    bus.write(PIA_PORTB, 0xFF);
    assert!(!bus.os_rom_visible());
    assert_eq!(bus.read(0xFFFC), 0x00, "RAM behind the vector is still zero");
}

#[test]
fn port_b_banking_switches_basic_and_self_test() {
    let (os_rom, basic_rom) = patterned_roms();
    let mut bus = test_bus();
    open_port_b(&mut bus);

    // BASIC out (bit 1 set), self-test in (bit 7 clear).
    bus.write(PIA_PORTB, 0x7E | 0x02);
    assert!(!bus.basic_rom_visible());
    assert!(bus.self_test_visible());
    assert_eq!(bus.read(0xA000), 0x00);
    assert_eq!(bus.read(0x5000), os_rom[0x1000]);
    assert_eq!(bus.read(0x57FF), os_rom[0x17FF]);

    // Back to power-on layout.
    bus.write(PIA_PORTB, 0xFC | 0x80);
    assert!(bus.basic_rom_visible());
    assert!(!bus.self_test_visible());
    assert_eq!(bus.read(0xA000), basic_rom[0]);
    assert_eq!(bus.read(0x5000), 0x00);
}

#[test]
fn chip_pages_mirror_their_registers() {
    let mut bus = test_bus();

    // ANTIC repeats every 16 bytes: $D4F2 is DLISTL.
    bus.write(0xD4F2, 0x34);
    bus.write(0xD4F3, 0x12);
    assert_eq!(bus.antic.dlist, 0x1234);

    // PIA repeats every 4 bytes.
    bus.write(0xD3FE, 0xFF); // PACTL mirror
    assert_eq!(bus.read(PIA_PACTL), 0xFF);

    // GTIA repeats every 32 bytes: $D0F0 is TRIG0.
    bus.gtia.set_trigger(0, true);
    assert_eq!(bus.read(0xD0F0), 0x00);
    assert_eq!(bus.read(0xD010), 0x00);
}

#[test]
fn open_bus_regions_float_high() {
    let mut bus = test_bus();
    for addr in [0xD100u16, 0xD1FF, 0xD500, 0xD6AB, 0xD7FF] {
        assert_eq!(bus.read(addr), 0xFF, "${addr:04X}");
        bus.write(addr, 0x12); // absorbed
        assert_eq!(bus.read(addr), 0xFF);
    }
}

#[test]
fn repeated_register_writes_keep_only_the_last() {
    let mut bus = test_bus();
    for value in [0x01u8, 0x02, 0x03] {
        bus.write(PIA_PACTL, value);
    }
    assert_eq!(bus.read(PIA_PACTL), 0x03);

    for value in [0x11u8, 0x22, 0x33] {
        bus.write(0xD400, value); // DMACTL
    }
    assert_eq!(bus.antic.dmactl, 0x33);
}

#[test]
fn port_a_reads_joystick_lines_active_low() {
    let mut bus = test_bus();
    bus.write(PIA_PACTL, 0x04); // select the data register

    assert_eq!(bus.read(PIA_PORTA), 0xFF, "idle sticks read high");

    bus.pia.set_joystick(0, true, false, false, false);
    bus.pia.set_joystick(1, false, false, true, false);
    assert_eq!(bus.read(PIA_PORTA), !(0x01 | 0x40));

    // Direction bits configured as outputs echo the data latch instead.
    bus.write(PIA_PACTL, 0x00);
    bus.write(PIA_PORTA, 0x0F); // DDR: low nibble outputs
    bus.write(PIA_PACTL, 0x04);
    bus.write(PIA_PORTA, 0x05);
    let value = bus.read(PIA_PORTA);
    assert_eq!(value & 0x0F, 0x05);
    assert_eq!(value & 0xF0, !(0x40u8) & 0xF0);
}

#[test]
fn gtia_console_and_pal_flags() {
    let mut bus = test_bus();
    assert_eq!(bus.read(0xD01F), 0xFF, "no console key held");
    bus.gtia.set_console(true, false, true);
    assert_eq!(bus.read(0xD01F), 0xF8 | 0x02);
    assert_eq!(bus.read(0xD014), 0x01, "PAL machine reports PAL");

    let (os_rom, basic_rom) = patterned_roms();
    let mut ntsc = Bus::new(os_rom, basic_rom, VideoSystem::Ntsc).unwrap();
    assert_eq!(ntsc.read(0xD014), 0x0F);
}

#[test]
fn antic_vcount_tracks_scanline_pairs() {
    let mut bus = test_bus();
    assert_eq!(bus.read(0xD40B), 0);
    bus.antic.advance_scanline(312);
    bus.antic.advance_scanline(312);
    bus.antic.advance_scanline(312);
    assert_eq!(bus.read(0xD40B), 1);
}

#[test]
fn pokey_irq_reaches_the_bus_line() {
    let mut bus = test_bus();
    assert!(!bus.irq_pending());
    bus.write(0xD20E, 0x40); // IRQEN: keyboard
    bus.pokey.set_key(0x3F, true);
    assert!(bus.irq_pending());
    assert_eq!(bus.read(0xD209), 0x3F); // KBCODE
    assert_eq!(bus.read(0xD20E) & 0x40, 0); // IRQST bit low
    bus.write(0xD20E, 0x00);
    assert!(!bus.irq_pending());
}

#[test]
fn reset_rezeroes_chips_but_not_ram() {
    let mut bus = test_bus();
    bus.write(0x1234, 0x99);
    bus.write(0xD400, 0x22); // DMACTL
    open_port_b(&mut bus);
    bus.write(PIA_PORTB, 0xFF);
    assert!(!bus.os_rom_visible());

    bus.reset();
    assert_eq!(bus.peek_ram(0x1234), 0x99);
    assert_eq!(bus.antic.dmactl, 0);
    assert!(bus.os_rom_visible());
    assert!(bus.basic_rom_visible());
    assert!(!bus.self_test_visible());
}

#[test]
fn video_reads_follow_banking() {
    let (os_rom, _) = patterned_roms();
    let mut bus = test_bus();

    assert_eq!(bus.video_read(0xE000), os_rom[0x2000]);
    bus.poke_ram(0xE000, 0x42);
    open_port_b(&mut bus);
    bus.write(PIA_PORTB, 0xFF);
    assert_eq!(bus.video_read(0xE000), 0x42);

    bus.write(PIA_PORTB, 0x7F); // self-test in
    assert_eq!(bus.video_read(0x5123), os_rom[0x1123]);
}
