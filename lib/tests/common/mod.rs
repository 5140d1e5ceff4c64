//! Small assembler for JVM class files, along with helpers to inspect converted code

#![allow(dead_code)]

use class2tiny::jvm::bytecode;
use class2tiny::tiny::{disassemble, Opcode, Record};
use std::collections::HashMap;

/// Builds a class file one constant, field, and method at a time
pub struct ClassAssembler {
    constants: Vec<u8>,

    /// Next free constant pool slot
    next_constant: u16,
    interned: HashMap<(u8, String), u16>,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    fields: Vec<Vec<u8>>,
    methods: Vec<Vec<u8>>,
    attributes: Vec<Vec<u8>>,
}

/// Body of a method, with raw JVM bytecode
#[derive(Clone)]
pub struct MethodCode {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,

    /// `(start_pc, end_pc, handler_pc, catch_type)`
    pub handlers: Vec<(u16, u16, u16, u16)>,

    /// `(start_pc, line_number)`
    pub lines: Vec<(u16, u16)>,
}

impl MethodCode {
    pub fn new(code: Vec<u8>) -> MethodCode {
        MethodCode {
            max_stack: 4,
            max_locals: 4,
            code,
            handlers: vec![],
            lines: vec![],
        }
    }

    pub fn with_lines(mut self, lines: Vec<(u16, u16)>) -> MethodCode {
        self.lines = lines;
        self
    }
}

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_FINAL: u16 = 0x0010;
pub const ACC_ABSTRACT: u16 = 0x0400;

impl ClassAssembler {
    /// Class extending `java/lang/Object`
    pub fn new(name: &str) -> ClassAssembler {
        let mut assembler = ClassAssembler {
            constants: vec![],
            next_constant: 1,
            interned: HashMap::new(),
            this_class: 0,
            super_class: 0,
            interfaces: vec![],
            fields: vec![],
            methods: vec![],
            attributes: vec![],
        };
        assembler.this_class = assembler.class(name);
        assembler.super_class = assembler.class("java/lang/Object");
        assembler
    }

    fn constant(&mut self, tag: u8, key: String, payload: &[u8], slots: u16) -> u16 {
        if let Some(index) = self.interned.get(&(tag, key.clone())) {
            return *index;
        }
        let index = self.next_constant;
        self.constants.push(tag);
        self.constants.extend_from_slice(payload);
        self.next_constant += slots;
        self.interned.insert((tag, key), index);
        index
    }

    /// Plain ASCII only
    pub fn utf8(&mut self, string: &str) -> u16 {
        let mut payload = (string.len() as u16).to_be_bytes().to_vec();
        payload.extend_from_slice(string.as_bytes());
        self.constant(1, string.to_string(), &payload, 1)
    }

    /// `CONSTANT_String` over already encoded modified UTF-8
    pub fn raw_string(&mut self, bytes: &[u8]) -> u16 {
        let key = format!("{:?}", bytes);
        let mut payload = (bytes.len() as u16).to_be_bytes().to_vec();
        payload.extend_from_slice(bytes);
        let utf8 = self.constant(1, key.clone(), &payload, 1);
        self.constant(8, key, &utf8.to_be_bytes(), 1)
    }

    pub fn integer(&mut self, value: i32) -> u16 {
        self.constant(3, value.to_string(), &value.to_be_bytes(), 1)
    }

    pub fn long(&mut self, value: i64) -> u16 {
        self.constant(5, value.to_string(), &value.to_be_bytes(), 2)
    }

    pub fn class(&mut self, name: &str) -> u16 {
        let name_index = self.utf8(name);
        self.constant(7, name.to_string(), &name_index.to_be_bytes(), 1)
    }

    pub fn string(&mut self, value: &str) -> u16 {
        let utf8 = self.utf8(value);
        self.constant(8, value.to_string(), &utf8.to_be_bytes(), 1)
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        let mut payload = name_index.to_be_bytes().to_vec();
        payload.extend_from_slice(&descriptor_index.to_be_bytes());
        self.constant(12, format!("{}:{}", name, descriptor), &payload, 1)
    }

    fn member_ref(&mut self, tag: u8, class: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class(class);
        let name_and_type = self.name_and_type(name, descriptor);
        let mut payload = class_index.to_be_bytes().to_vec();
        payload.extend_from_slice(&name_and_type.to_be_bytes());
        self.constant(tag, format!("{}.{}:{}", class, name, descriptor), &payload, 1)
    }

    pub fn field_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        self.member_ref(9, class, name, descriptor)
    }

    pub fn method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        self.member_ref(10, class, name, descriptor)
    }

    pub fn interface(&mut self, name: &str) {
        let index = self.class(name);
        self.interfaces.push(index);
    }

    fn attribute(&mut self, name: &str, info: &[u8]) -> Vec<u8> {
        let mut attribute = self.utf8(name).to_be_bytes().to_vec();
        attribute.extend_from_slice(&(info.len() as u32).to_be_bytes());
        attribute.extend_from_slice(info);
        attribute
    }

    pub fn source_file(&mut self, file: &str) {
        let file_index = self.utf8(file);
        let attribute = self.attribute("SourceFile", &file_index.to_be_bytes());
        self.attributes.push(attribute);
    }

    pub fn field(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        constant: Option<u16>,
    ) {
        let mut field = access_flags.to_be_bytes().to_vec();
        field.extend_from_slice(&self.utf8(name).to_be_bytes());
        field.extend_from_slice(&self.utf8(descriptor).to_be_bytes());
        match constant {
            None => field.extend_from_slice(&0u16.to_be_bytes()),
            Some(index) => {
                field.extend_from_slice(&1u16.to_be_bytes());
                let attribute = self.attribute("ConstantValue", &index.to_be_bytes());
                field.extend_from_slice(&attribute);
            }
        }
        self.fields.push(field);
    }

    pub fn method(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        code: Option<MethodCode>,
    ) {
        let mut method = access_flags.to_be_bytes().to_vec();
        method.extend_from_slice(&self.utf8(name).to_be_bytes());
        method.extend_from_slice(&self.utf8(descriptor).to_be_bytes());
        match code {
            None => method.extend_from_slice(&0u16.to_be_bytes()),
            Some(code) => {
                method.extend_from_slice(&1u16.to_be_bytes());
                let attribute = self.code_attribute(&code);
                method.extend_from_slice(&attribute);
            }
        }
        self.methods.push(method);
    }

    /// Static method `name()V`
    pub fn static_method(&mut self, name: &str, code: Vec<u8>) {
        self.method(ACC_PUBLIC | ACC_STATIC, name, "()V", Some(MethodCode::new(code)));
    }

    fn code_attribute(&mut self, code: &MethodCode) -> Vec<u8> {
        let mut info = code.max_stack.to_be_bytes().to_vec();
        info.extend_from_slice(&code.max_locals.to_be_bytes());
        info.extend_from_slice(&(code.code.len() as u32).to_be_bytes());
        info.extend_from_slice(&code.code);
        info.extend_from_slice(&(code.handlers.len() as u16).to_be_bytes());
        for (start, end, handler, catch_type) in &code.handlers {
            for value in [start, end, handler, catch_type] {
                info.extend_from_slice(&value.to_be_bytes());
            }
        }
        if code.lines.is_empty() {
            info.extend_from_slice(&0u16.to_be_bytes());
        } else {
            info.extend_from_slice(&1u16.to_be_bytes());
            let mut table = (code.lines.len() as u16).to_be_bytes().to_vec();
            for (start_pc, line) in &code.lines {
                table.extend_from_slice(&start_pc.to_be_bytes());
                table.extend_from_slice(&line.to_be_bytes());
            }
            let attribute = self.attribute("LineNumberTable", &table);
            info.extend_from_slice(&attribute);
        }
        self.attribute("Code", &info)
    }

    pub fn finish(self) -> Vec<u8> {
        let mut out = vec![0xca, 0xfe, 0xba, 0xbe, 0, 0, 0, 52];
        out.extend_from_slice(&self.next_constant.to_be_bytes());
        out.extend_from_slice(&self.constants);
        out.extend_from_slice(&(ACC_PUBLIC | 0x0020).to_be_bytes());
        out.extend_from_slice(&self.this_class.to_be_bytes());
        out.extend_from_slice(&self.super_class.to_be_bytes());
        out.extend_from_slice(&(self.interfaces.len() as u16).to_be_bytes());
        for interface in &self.interfaces {
            out.extend_from_slice(&interface.to_be_bytes());
        }
        for section in [&self.fields, &self.methods, &self.attributes] {
            out.extend_from_slice(&(section.len() as u16).to_be_bytes());
            for entry in section {
                out.extend_from_slice(entry);
            }
        }
        out
    }
}

/// Start offsets of the instructions in tiny code (parameter records excluded)
pub fn tiny_instruction_offsets(code: &[u8]) -> Vec<usize> {
    disassemble(code)
        .unwrap()
        .into_iter()
        .filter(|(_, _, record)| !matches!(record, Record::Values(_, _) | Record::Target(_)))
        .map(|(offset, _, _)| offset.0)
        .collect()
}

/// Every branch of tiny code, as `(from, to)` instruction positions
pub fn tiny_branches(code: &[u8]) -> Vec<(usize, usize)> {
    let starts = tiny_instruction_offsets(code);
    let position = |offset: i64| {
        starts
            .binary_search(&(offset as usize))
            .expect("branch does not land on an instruction")
    };

    let mut branches = vec![];
    let mut switch_start = 0;
    for (offset, _, record) in disassemble(code).unwrap().into_iter() {
        let offset = offset.0 as i64;
        match record {
            Record::RegDisp {
                opcode: Opcode::Goto,
                disp,
                ..
            } => branches.push((position(offset), position(offset + disp as i64))),
            Record::ShortImmReg { opcode, imm, .. } if opcode != Opcode::ConstI => {
                branches.push((position(offset), position(offset + imm as i64)))
            }
            Record::SwitchHeader { .. } => switch_start = offset,
            Record::Target(disp) => {
                branches.push((position(switch_start), position(switch_start + disp as i64)))
            }
            _ => (),
        }
    }
    branches
}

/// Every branch of JVM code, as `(from, to)` instruction positions
pub fn jvm_branches(code: &[u8]) -> Vec<(usize, usize)> {
    let decoded = bytecode::decode(code, &[]).unwrap();
    let offsets: Vec<u32> = decoded.iter().map(|insn| insn.offset).collect();
    let mut branches = vec![];
    for (from, insn) in decoded.iter().enumerate() {
        for target in insn.op.jump_targets() {
            branches.push((from, offsets.binary_search(&target).unwrap()));
        }
    }
    branches
}
