use super::{emit, ClassPool, Diagnostic, Error, MethodTranslator, Settings, SymbolTable};
use crate::ir::passes;
use crate::jvm::class_file::{ClassFile, Constant, ConstantIndex, Field, Method};
use crate::jvm;
use crate::tiny::{Serialize, TinyClass, TinyConstant, TinyField, TinyMethod};
use std::io::Write;

/// Serialized tiny class, along with problems with methods that had to be left out
#[derive(Debug)]
pub struct TinyClassBytes {
    pub bytes: Vec<u8>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Main entry point for converting class files
///
/// A converter is cheap and holds no per-class state, so one can be shared by many threads as
/// long as they share the same `SymbolTable`.
pub struct Converter<'a> {
    settings: &'a Settings,
    symbols: &'a SymbolTable,
}

impl<'a> Converter<'a> {
    pub fn new(settings: &'a Settings, symbols: &'a SymbolTable) -> Converter<'a> {
        Converter { settings, symbols }
    }

    /// Convert one class file into a tiny class image
    ///
    /// `Err` is returned only when no image can be produced at all. Otherwise, methods that
    /// could not be converted are omitted and described in `TinyClassBytes::diagnostics`.
    pub fn convert_class(&self, bytes: &[u8]) -> Result<TinyClassBytes, Vec<Diagnostic>> {
        let mut out = vec![];
        let diagnostics = self.convert_into(bytes, &mut out)?;
        Ok(TinyClassBytes {
            bytes: out,
            diagnostics,
        })
    }

    /// Convert one class file, writing the image into `writer`
    ///
    /// On success, returns diagnostics for the methods that were left out.
    pub fn convert_into<W: Write>(
        &self,
        bytes: &[u8],
        writer: &mut W,
    ) -> Result<Vec<Diagnostic>, Vec<Diagnostic>> {
        let class = ClassFile::parse(bytes).map_err(|err| {
            vec![Diagnostic {
                class: String::from("<unreadable class>"),
                method: None,
                error: Error::from(err),
            }]
        })?;
        let class_name = match class.name() {
            Ok(name) => name.to_string(),
            Err(err) => {
                return Err(vec![Diagnostic {
                    class: String::from("<unnamed class>"),
                    method: None,
                    error: Error::from(err),
                }])
            }
        };
        log::debug!("converting {} (class file version {})", class_name, class.version);

        let mut translator = ClassTranslator {
            settings: self.settings,
            symbols: self.symbols,
            class: &class,
            class_name: &class_name,
            pool: ClassPool::new(),
            diagnostics: vec![],
        };
        let (tiny_class, mut diagnostics) = match translator.translate() {
            Ok(tiny_class) => (tiny_class, translator.diagnostics),
            Err(error) => {
                let mut diagnostics = translator.diagnostics;
                diagnostics.push(class_diagnostic(&class_name, error));
                return Err(diagnostics);
            }
        };

        if let Err(err) = tiny_class.serialize(writer) {
            diagnostics.push(class_diagnostic(&class_name, Error::WriteFailure(err)));
            return Err(diagnostics);
        }
        Ok(diagnostics)
    }
}

fn class_diagnostic(class_name: &str, error: Error) -> Diagnostic {
    log::warn!("{}: {}", class_name, error);
    Diagnostic {
        class: class_name.to_string(),
        method: None,
        error,
    }
}

/// Context for translating a single class
struct ClassTranslator<'a> {
    settings: &'a Settings,
    symbols: &'a SymbolTable,
    class: &'a ClassFile,
    class_name: &'a str,
    pool: ClassPool,

    /// Methods that were left out so far
    diagnostics: Vec<Diagnostic>,
}

impl<'a> ClassTranslator<'a> {
    /// Build the tiny class, failing only for problems with the class as a whole
    fn translate(&mut self) -> Result<TinyClass, Error> {
        let class = self.class;
        let this_class = self.symbols.intern(self.class_name)?;
        let super_class = match class.super_name()? {
            Some(name) => Some(self.symbols.intern(name)?),
            None => None,
        };
        let interfaces = class
            .interfaces
            .iter()
            .map(|index| self.symbols.intern(class.constants.class_name(*index)?))
            .collect::<Result<Vec<_>, Error>>()?;
        let source_file = match class.source_file()? {
            Some(file) => Some(self.pool.get_name(file)?),
            None => None,
        };

        let mut fields = vec![];
        for field in &class.fields {
            fields.push(self.visit_field(field)?);
        }

        let mut methods = vec![];
        for method in &class.methods {
            let signature = method.signature(&class.constants)?;
            log::debug!("converting method {}.{}", self.class_name, signature);

            let checkpoint = self.pool.checkpoint();
            match self.visit_method(method) {
                Ok(tiny_method) => methods.push(tiny_method),
                Err(error) if error.is_class_fatal() => return Err(error),
                Err(error) => {
                    self.pool.rollback(checkpoint);
                    log::warn!("{}.{}: {}", self.class_name, signature, error);
                    self.diagnostics.push(Diagnostic {
                        class: self.class_name.to_string(),
                        method: Some(signature),
                        error,
                    });
                }
            }
        }

        let pool = std::mem::take(&mut self.pool);
        let (names, constants, members) = pool.into_tables();
        Ok(TinyClass {
            access_flags: class.access_flags.bits(),
            this_class,
            super_class,
            source_file,
            interfaces,
            names,
            constants,
            members,
            fields,
            methods,
        })
    }

    fn visit_field(&mut self, field: &Field) -> Result<TinyField, Error> {
        let class: &'a ClassFile = self.class;
        let constants = &class.constants;
        let constant_value = match field.constant_value(constants)? {
            Some(index) => {
                let constant = self.field_constant(index)?;
                Some(self.pool.get_constant(constant)?)
            }
            None => None,
        };
        Ok(TinyField {
            access_flags: field.access_flags.bits(),
            name: self.pool.get_name(constants.utf8(field.name_index)?)?,
            descriptor: self.pool.get_name(constants.utf8(field.descriptor_index)?)?,
            constant_value,
        })
    }

    /// Initial value of a field, as a tiny constant
    fn field_constant(&mut self, index: ConstantIndex) -> Result<TinyConstant, Error> {
        let class: &'a ClassFile = self.class;
        let constants = &class.constants;
        let constant = match constants.get(index)? {
            Constant::Integer(value) => TinyConstant::Int(*value),
            Constant::Float(value) => TinyConstant::Float(*value),
            Constant::Long(value) => TinyConstant::Long(*value),
            Constant::Double(value) => TinyConstant::Double(*value),
            Constant::String(string) => {
                TinyConstant::String(self.pool.get_name(constants.utf8(*string)?)?)
            }
            _ => {
                return Err(Error::from(jvm::Error::WrongConstantKind {
                    index: index.0,
                    expected: "field constant",
                }))
            }
        };
        Ok(constant)
    }

    fn visit_method(&mut self, method: &Method) -> Result<TinyMethod, Error> {
        let class: &'a ClassFile = self.class;
        let constants = &class.constants;
        let name = self.pool.get_name(constants.utf8(method.name_index)?)?;
        let descriptor = self.pool.get_name(constants.utf8(method.descriptor_index)?)?;
        let access_flags = method.access_flags.bits();

        let code = match method.code(constants)? {
            Some(code) => code,
            None => {
                return Ok(TinyMethod {
                    access_flags,
                    name,
                    descriptor,
                    max_stack: 0,
                    max_locals: 0,
                    code: vec![],
                    lines: vec![],
                    handlers: vec![],
                })
            }
        };

        let mut body = MethodTranslator::new(self.settings, constants, &mut self.pool, self.symbols)
            .translate(&code)?;
        if self.settings.eliminate_nops {
            body = passes::eliminate_nops(&body);
        }
        log::trace!("IR of {}:\n{}", self.class_name, body.listing());
        let emitted = emit(&body, self.settings)?;

        Ok(TinyMethod {
            access_flags,
            name,
            descriptor,
            max_stack: body.max_stack,
            max_locals: body.max_locals,
            code: emitted.code,
            lines: emitted.lines,
            handlers: emitted.handlers,
        })
    }
}
