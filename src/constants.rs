//! Bit-field widths and opcode groups for the RV64IMFD instruction word.

pub const XLEN: u32 = 64;
pub const WORD_BYTES: u32 = 4;

pub const NUM_GPR: usize = 32;
pub const NUM_FPR: usize = 32;
pub const NUM_CSR: usize = 4096;

pub const OPCODE_MASK: u32 = 0b111_1111;
pub const REG_MASK: u32 = 0b1_1111;
pub const FUNCT2_MASK: u32 = 0b11;
pub const FUNCT3_MASK: u32 = 0b111;
pub const FUNCT5_MASK: u32 = 0b1_1111;
pub const FUNCT7_MASK: u32 = 0b111_1111;

// Opcode groups, as recognized by the control/decode unit (4.G).
pub const OPCODE_RTYPE: u32 = 0b0110011;
pub const OPCODE_RTYPE_W: u32 = 0b0111011;
pub const OPCODE_ITYPE: u32 = 0b0010011;
pub const OPCODE_ITYPE_W: u32 = 0b0011011;
pub const OPCODE_LOAD: u32 = 0b0000011;
pub const OPCODE_STORE: u32 = 0b0100011;
pub const OPCODE_BRANCH: u32 = 0b1100011;
pub const OPCODE_LUI: u32 = 0b0110111;
pub const OPCODE_AUIPC: u32 = 0b0010111;
pub const OPCODE_JAL: u32 = 0b1101111;
pub const OPCODE_JALR: u32 = 0b1100111;
pub const OPCODE_SYSTEM: u32 = 0b1110011;
pub const OPCODE_FLOAD: u32 = 0b0000111;
pub const OPCODE_FSTORE: u32 = 0b0100111;
pub const OPCODE_FP: u32 = 0b1010011;
pub const OPCODE_FMADD: u32 = 0b1000011;
pub const OPCODE_FMSUB: u32 = 0b1000111;
pub const OPCODE_FNMSUB: u32 = 0b1001011;
pub const OPCODE_FNMADD: u32 = 0b1001111;

// CSR addresses used by this core (4.B).
pub const CSR_FFLAGS: u32 = 0x001;
pub const CSR_FRM: u32 = 0x002;
pub const CSR_FCSR: u32 = 0x003;

// IEEE exception flag bit positions within fflags/fcsr[4:0].
pub const FFLAG_NX: u64 = 0b00001;
pub const FFLAG_UF: u64 = 0b00010;
pub const FFLAG_OF: u64 = 0b00100;
pub const FFLAG_DZ: u64 = 0b01000;
pub const FFLAG_NV: u64 = 0b10000;

pub const DEFAULT_BLOCK_SIZE: u64 = 1024;
pub const DEFAULT_MEMORY_SIZE: u64 = u64::MAX;
pub const DEFAULT_DATA_SECTION_START: u64 = 0x1000_0000;
pub const DEFAULT_TEXT_SECTION_START: u64 = 0x0;
pub const DEFAULT_BSS_SECTION_START: u64 = 0x1100_0000;
pub const DEFAULT_INSTRUCTION_EXECUTION_LIMIT: u64 = 100;
