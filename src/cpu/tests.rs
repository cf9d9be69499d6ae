use super::*;
use crate::bus::{Bus, OS_ROM_RESET_VECTOR};
use crate::palette::VideoSystem;

/// Build a bus whose OS ROM carries `program` at $C000 with the reset
/// vector pointing at it. Stores and stack traffic land in RAM as usual.
fn test_bus_with_program(program: &[u8]) -> Bus {
    let mut os_rom = vec![0u8; 16 * 1024];
    os_rom[..program.len()].copy_from_slice(program);
    os_rom[OS_ROM_RESET_VECTOR] = 0x00;
    os_rom[OS_ROM_RESET_VECTOR + 1] = 0xC0;
    Bus::new(os_rom, vec![0; 8 * 1024], VideoSystem::Pal).unwrap()
}

fn setup_cpu_with_program(program: &[u8]) -> (Cpu, Bus) {
    let mut bus = test_bus_with_program(program);
    let mut cpu = Cpu::new();
    cpu.reset(&mut bus);
    (cpu, bus)
}

#[test]
fn reset_fetches_vector_and_masks_flags() {
    let (cpu, _) = setup_cpu_with_program(&[0xEA]);
    assert_eq!(cpu.pc, 0xC000);
    assert_eq!(cpu.sp, 0xFD);
    assert!(cpu.flag(FLAG_INTERRUPT_DISABLE));
    assert!(!cpu.halted);
}

#[test]
fn lda_immediate_sets_zero_and_negative() {
    let (mut cpu, mut bus) = setup_cpu_with_program(&[0xA9, 0x00, 0xA9, 0x80]);
    let cycles = cpu.step(&mut bus);
    assert_eq!(cycles, 2);
    assert_eq!(cpu.a, 0x00);
    assert!(cpu.flag(FLAG_ZERO));
    cpu.step(&mut bus);
    assert_eq!(cpu.a, 0x80);
    assert!(cpu.flag(FLAG_NEGATIVE));
    assert!(!cpu.flag(FLAG_ZERO));
}

#[test]
fn adc_handles_carry_and_overflow() {
    let (mut cpu, mut bus) = setup_cpu_with_program(&[0x69, 0x01, 0x69, 0x80]);
    cpu.a = 0x7F;
    cpu.step(&mut bus); // ADC #$01 -> 0x80, signed overflow
    assert_eq!(cpu.a, 0x80);
    assert!(cpu.flag(FLAG_OVERFLOW));
    assert!(cpu.flag(FLAG_NEGATIVE));
    cpu.step(&mut bus); // ADC #$80 -> 0x00 with carry out
    assert_eq!(cpu.a, 0x00);
    assert!(cpu.flag(FLAG_CARRY));
    assert!(cpu.flag(FLAG_ZERO));
}

#[test]
fn adc_decimal_mode_adds_bcd() {
    // SED; ADC #$38 with A=$45 and C clear.
    let (mut cpu, mut bus) = setup_cpu_with_program(&[0xF8, 0x69, 0x38]);
    cpu.a = 0x45;
    cpu.set_flag(FLAG_CARRY, false);
    cpu.step(&mut bus); // SED
    let cycles = cpu.step(&mut bus);
    assert_eq!(cycles, 2);
    assert_eq!(cpu.a, 0x83);
    assert!(!cpu.flag(FLAG_CARRY));
    assert!(!cpu.flag(FLAG_ZERO));
    assert!(!cpu.flag(FLAG_NEGATIVE));
}

#[test]
fn adc_decimal_mode_carries_out() {
    let (mut cpu, mut bus) = setup_cpu_with_program(&[0xF8, 0x69, 0x01]);
    cpu.a = 0x99;
    cpu.set_flag(FLAG_CARRY, false);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.a, 0x00);
    assert!(cpu.flag(FLAG_CARRY));
}

#[test]
fn sbc_decimal_mode_subtracts_bcd() {
    // SED; SEC; SBC #$25 with A=$50.
    let (mut cpu, mut bus) = setup_cpu_with_program(&[0xF8, 0x38, 0xE9, 0x25]);
    cpu.a = 0x50;
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.a, 0x25);
    assert!(cpu.flag(FLAG_CARRY));
}

#[test]
fn absolute_indexed_read_pays_page_cross_penalty() {
    // LDX #$01; LDA $00FF,X (crosses into $0100); LDA $0200,X (no cross).
    let (mut cpu, mut bus) =
        setup_cpu_with_program(&[0xA2, 0x01, 0xBD, 0xFF, 0x00, 0xBD, 0x00, 0x02]);
    bus.write(0x0100, 0x55);
    bus.write(0x0201, 0x66);
    cpu.step(&mut bus);
    assert_eq!(cpu.step(&mut bus), 5);
    assert_eq!(cpu.a, 0x55);
    assert_eq!(cpu.step(&mut bus), 4);
    assert_eq!(cpu.a, 0x66);
}

#[test]
fn indirect_y_read_pays_page_cross_penalty() {
    // LDY #$01; LDA ($80),Y with pointer $02FF -> reads $0300.
    let (mut cpu, mut bus) = setup_cpu_with_program(&[0xA0, 0x01, 0xB1, 0x80]);
    bus.write(0x0080, 0xFF);
    bus.write(0x0081, 0x02);
    bus.write(0x0300, 0x77);
    cpu.step(&mut bus);
    assert_eq!(cpu.step(&mut bus), 6);
    assert_eq!(cpu.a, 0x77);
}

#[test]
fn branch_cycle_accounting() {
    // BNE not taken (Z set), then BNE taken forward, then BNE taken across
    // a page boundary (backward past $C000).
    let (mut cpu, mut bus) = setup_cpu_with_program(&[0xD0, 0x01, 0xEA]);
    cpu.set_flag(FLAG_ZERO, true);
    assert_eq!(cpu.step(&mut bus), 2);
    assert_eq!(cpu.pc, 0xC002);

    let (mut cpu, mut bus) = setup_cpu_with_program(&[0xD0, 0x02]);
    cpu.set_flag(FLAG_ZERO, false);
    assert_eq!(cpu.step(&mut bus), 3);
    assert_eq!(cpu.pc, 0xC004);

    let (mut cpu, mut bus) = setup_cpu_with_program(&[0xD0, 0x80]);
    cpu.set_flag(FLAG_ZERO, false);
    assert_eq!(cpu.step(&mut bus), 4); // target $BF82 is on another page
    assert_eq!(cpu.pc, 0xBF82);
}

#[test]
fn pha_pla_round_trip_preserves_accumulator() {
    let (mut cpu, mut bus) = setup_cpu_with_program(&[0x48, 0x68]);
    cpu.a = 0xA7;
    let sp_before = cpu.sp;
    assert_eq!(cpu.step(&mut bus), 3);
    assert_eq!(cpu.sp, sp_before.wrapping_sub(1));
    cpu.a = 0x00;
    assert_eq!(cpu.step(&mut bus), 4);
    assert_eq!(cpu.a, 0xA7);
    assert_eq!(cpu.sp, sp_before);
    assert!(cpu.flag(FLAG_NEGATIVE));
}

#[test]
fn stack_wraps_within_page_one() {
    let (mut cpu, mut bus) = setup_cpu_with_program(&[0x48, 0x48]);
    cpu.sp = 0x00;
    cpu.a = 0x12;
    cpu.step(&mut bus);
    assert_eq!(cpu.sp, 0xFF);
    assert_eq!(bus.read(0x0100), 0x12);
    cpu.step(&mut bus);
    assert_eq!(cpu.sp, 0xFE);
    assert_eq!(bus.read(0x01FF), 0x12);
}

#[test]
fn jmp_indirect_reproduces_page_wrap_bug() {
    // JMP ($02FF): low byte from $02FF, high byte from $0200.
    let (mut cpu, mut bus) = setup_cpu_with_program(&[0x6C, 0xFF, 0x02]);
    bus.write(0x02FF, 0x34);
    bus.write(0x0200, 0x12);
    bus.write(0x0300, 0x99); // would be used by a corrected fetch
    assert_eq!(cpu.step(&mut bus), 5);
    assert_eq!(cpu.pc, 0x1234);
}

#[test]
fn jsr_rts_round_trip() {
    // JSR $C010; ...; at $C010 RTS.
    let mut program = [0xEA; 0x20];
    program[0] = 0x20;
    program[1] = 0x10;
    program[2] = 0xC0;
    program[0x10] = 0x60;
    let (mut cpu, mut bus) = setup_cpu_with_program(&program);
    assert_eq!(cpu.step(&mut bus), 6);
    assert_eq!(cpu.pc, 0xC010);
    assert_eq!(cpu.step(&mut bus), 6);
    assert_eq!(cpu.pc, 0xC003);
    assert_eq!(cpu.sp, 0xFD);
}

#[test]
fn nmi_dispatch_pushes_state_and_vectors() {
    let mut os_rom = vec![0u8; 16 * 1024];
    os_rom[0] = 0xEA;
    os_rom[OS_ROM_RESET_VECTOR] = 0x00;
    os_rom[OS_ROM_RESET_VECTOR + 1] = 0xC0;
    os_rom[0x3FFA] = 0x40;
    os_rom[0x3FFB] = 0x50;
    let mut bus = Bus::new(os_rom, vec![0; 8 * 1024], VideoSystem::Pal).unwrap();
    let mut cpu = Cpu::new();
    cpu.reset(&mut bus);
    cpu.set_flag(FLAG_INTERRUPT_DISABLE, false);
    let sp_before = cpu.sp;

    cpu.request_nmi();
    let cycles = cpu.step(&mut bus);

    assert_eq!(cycles, 7);
    assert_eq!(cpu.pc, 0x5040);
    assert!(cpu.flag(FLAG_INTERRUPT_DISABLE));
    assert_eq!(cpu.sp, sp_before.wrapping_sub(3));
    // PC high, PC low, then status with B clear and bit 5 set.
    assert_eq!(bus.read(0x0100 | sp_before as u16), 0xC0);
    assert_eq!(bus.read(0x0100 | sp_before.wrapping_sub(1) as u16), 0x00);
    let pushed = bus.read(0x0100 | sp_before.wrapping_sub(2) as u16);
    assert_eq!(pushed & FLAG_BREAK, 0);
    assert_ne!(pushed & FLAG_UNUSED, 0);
}

#[test]
fn irq_respects_interrupt_disable() {
    let mut os_rom = vec![0u8; 16 * 1024];
    os_rom[0] = 0xEA;
    os_rom[1] = 0xEA;
    os_rom[OS_ROM_RESET_VECTOR] = 0x00;
    os_rom[OS_ROM_RESET_VECTOR + 1] = 0xC0;
    os_rom[0x3FFE] = 0x00;
    os_rom[0x3FFF] = 0x40;
    let mut bus = Bus::new(os_rom, vec![0; 8 * 1024], VideoSystem::Pal).unwrap();
    let mut cpu = Cpu::new();
    cpu.reset(&mut bus);

    // I is set after reset: the latched IRQ must wait.
    cpu.request_irq();
    cpu.step(&mut bus);
    assert_eq!(cpu.pc, 0xC001);

    cpu.set_flag(FLAG_INTERRUPT_DISABLE, false);
    cpu.request_irq();
    let cycles = cpu.step(&mut bus);
    assert_eq!(cycles, 7);
    assert_eq!(cpu.pc, 0x4000);
    assert!(cpu.flag(FLAG_INTERRUPT_DISABLE));
}

#[test]
fn brk_pushes_return_past_padding_with_b_set() {
    let mut os_rom = vec![0u8; 16 * 1024];
    os_rom[OS_ROM_RESET_VECTOR] = 0x00;
    os_rom[OS_ROM_RESET_VECTOR + 1] = 0xC0;
    os_rom[0x3FFE] = 0x00;
    os_rom[0x3FFF] = 0x60;
    let mut bus = Bus::new(os_rom, vec![0; 8 * 1024], VideoSystem::Pal).unwrap();
    let mut cpu = Cpu::new();
    cpu.reset(&mut bus);
    let sp_before = cpu.sp;

    let cycles = cpu.step(&mut bus); // BRK (opcode $00 at $C000)
    assert_eq!(cycles, 7);
    assert_eq!(cpu.pc, 0x6000);
    assert_eq!(bus.read(0x0100 | sp_before as u16), 0xC0);
    assert_eq!(bus.read(0x0100 | sp_before.wrapping_sub(1) as u16), 0x02);
    let pushed = bus.read(0x0100 | sp_before.wrapping_sub(2) as u16);
    assert_ne!(pushed & FLAG_BREAK, 0);
}

#[test]
fn rti_restores_status_and_pc() {
    let (mut cpu, mut bus) = setup_cpu_with_program(&[0x40]);
    // Hand-build an interrupt frame: status, then return address $C123.
    bus.write(0x01FD, FLAG_CARRY | FLAG_ZERO);
    bus.write(0x01FE, 0x23);
    bus.write(0x01FF, 0xC1);
    cpu.sp = 0xFC;
    assert_eq!(cpu.step(&mut bus), 6);
    assert_eq!(cpu.pc, 0xC123);
    assert!(cpu.flag(FLAG_CARRY));
    assert!(cpu.flag(FLAG_ZERO));
    assert!(!cpu.flag(FLAG_BREAK));
}

#[test]
fn undocumented_opcodes_run_as_two_byte_nops() {
    let (mut cpu, mut bus) = setup_cpu_with_program(&[0x07, 0x00, 0x87, 0x00]);
    cpu.a = 0x3C;
    cpu.x = 0x5A;
    let status = cpu.status;
    assert_eq!(cpu.step(&mut bus), 2);
    assert_eq!(cpu.pc, 0xC002);
    assert_eq!(cpu.step(&mut bus), 2);
    assert_eq!(cpu.pc, 0xC004);
    assert_eq!(cpu.a, 0x3C);
    assert_eq!(cpu.x, 0x5A);
    assert_eq!(cpu.status, status);
    assert!(!cpu.halted);
}

#[test]
fn jam_opcode_halts_with_pc_on_instruction() {
    let (mut cpu, mut bus) = setup_cpu_with_program(&[0xEA, 0x02]);
    cpu.step(&mut bus);
    let cycles = cpu.step(&mut bus);
    assert_eq!(cycles, 0);
    assert!(cpu.halted);
    assert_eq!(cpu.pc, 0xC001);
    assert_eq!(cpu.last_opcode(), 0x02);
    // A halted CPU stays halted.
    assert_eq!(cpu.step(&mut bus), 0);
}

#[test]
fn asl_and_ror_memory_read_modify_write() {
    // ASL $80; ROR $80 with carry clear.
    let (mut cpu, mut bus) = setup_cpu_with_program(&[0x06, 0x80, 0x66, 0x80]);
    bus.write(0x0080, 0xC1);
    assert_eq!(cpu.step(&mut bus), 5);
    assert_eq!(bus.read(0x0080), 0x82);
    assert!(cpu.flag(FLAG_CARRY));
    assert_eq!(cpu.step(&mut bus), 5);
    // Carry from ASL rotates into bit 7.
    assert_eq!(bus.read(0x0080), 0xC1);
}

#[test]
fn cmp_sets_carry_zero_negative() {
    let (mut cpu, mut bus) = setup_cpu_with_program(&[0xC9, 0x10, 0xC9, 0x20, 0xC9, 0x21]);
    cpu.a = 0x20;
    cpu.step(&mut bus);
    assert!(cpu.flag(FLAG_CARRY));
    assert!(!cpu.flag(FLAG_ZERO));
    cpu.step(&mut bus);
    assert!(cpu.flag(FLAG_CARRY));
    assert!(cpu.flag(FLAG_ZERO));
    cpu.step(&mut bus);
    assert!(!cpu.flag(FLAG_CARRY));
    assert!(cpu.flag(FLAG_NEGATIVE));
}
