use super::{Artifact, Backend, Compilation, CompileOptions, EntryPoint, Liveness, NativeCode};
use crate::ast::Ast;
use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::frontend::{analyze, Analysis};
use crate::library::{self, Export, Intrinsic, POW_SYMBOL, REM_SYMBOL};
use crate::unit::{CodeUnit, ReturnType};
use cranelift::prelude::*;
use cranelift_codegen::ir::FuncRef;
use cranelift_codegen::settings::{self, Configurable};
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{default_libcall_names, FuncId, FuncOrDataId, Linkage, Module};
use hashbrown::HashMap;
use std::time::Instant;

/// A backend generating native code with Cranelift.
///
/// Every compilation gets its own JIT module, holding the machine code of a
/// single function. The module becomes the artifact, and its memory is
/// released together with it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Jit;

impl Backend for Jit {
    fn name(&self) -> &'static str {
        "cranelift"
    }

    fn compile(&self, unit: &CodeUnit, options: &CompileOptions) -> Result<Compilation, Diagnostics> {
        let analysis = analyze(unit, options)?;
        let failure = |message: String| -> Diagnostics {
            Diagnostic::error("CF0900", message, 0..unit.body().len()).into()
        };

        let watch = Instant::now();
        let mut session = Session::new(options).map_err(failure)?;
        let id = session.define(&unit.symbol(), &analysis).map_err(failure)?;
        let artifact = session.finish(id).map_err(failure)?;
        debug!(
            "generated native code for {} in {}us",
            unit.symbol(),
            watch.elapsed().as_micros()
        );

        Ok(Compilation {
            artifact: Box::new(artifact),
            warnings: analysis.warnings,
        })
    }
}

/// The code generator for one compilation. Dropping a session that did not
/// finish releases everything it allocated.
struct Session {
    /// The function builder context, reused by the FunctionBuilder.
    builder_context: FunctionBuilderContext,

    /// The main Cranelift context, which holds the state for codegen.
    ctx: cranelift_codegen::Context,

    /// The module, with the jit backend, which manages the JIT'd function.
    /// Taken out when the session finishes.
    module: Option<JITModule>,

    /// Emit native instructions for library functions that have one
    intrinsics: bool,
}

impl Session {
    fn new(options: &CompileOptions) -> Result<Self, String> {
        let mut flag_builder = settings::builder();
        let opt_level = if options.optimize { "speed" } else { "none" };
        flag_builder
            .set("opt_level", opt_level)
            .map_err(|e| format!("settings error: {}", e))?;
        flag_builder
            .set("enable_verifier", "true")
            .map_err(|e| format!("settings error: {}", e))?;
        let isa_builder = cranelift_native::builder()
            .map_err(|e| format!("host machine is not supported: {}", e))?;
        let isa = isa_builder
            .finish(settings::Flags::new(flag_builder))
            .map_err(|e| e.to_string())?;

        let mut builder = JITBuilder::with_isa(isa, default_libcall_names());
        for (symbol, address) in library::symbols() {
            builder.symbol(symbol, address);
        }
        let module = JITModule::new(builder);

        Ok(Self {
            builder_context: FunctionBuilderContext::new(),
            ctx: module.make_context(),
            module: Some(module),
            intrinsics: options.optimize,
        })
    }

    /// Translate the analysed body into Cranelift IR, and compile it as an
    /// exported function named `symbol`.
    fn define(&mut self, symbol: &str, analysis: &Analysis) -> Result<FuncId, String> {
        let module = self.module.as_mut().ok_or("session already finished")?;

        let mut signature = module.make_signature();
        signature.params.push(AbiParam::new(types::F64));
        signature.returns.push(AbiParam::new(types::F64));
        let id = module
            .declare_function(symbol, Linkage::Export, &signature)
            .map_err(|e| e.to_string())?;
        self.ctx.func.signature = signature;

        let mut builder = FunctionBuilder::new(&mut self.ctx.func, &mut self.builder_context);

        // Single block: the body is one expression, without control flow.
        let entry_block = builder.create_block();
        builder.append_block_params_for_function_params(entry_block);
        builder.switch_to_block(entry_block);
        builder.seal_block(entry_block);
        let parameter = builder.block_params(entry_block)[0];

        let mut translator = FunctionTranslator {
            builder,
            parameter,
            module: &mut *module,
            functions: HashMap::new(),
            intrinsics: self.intrinsics,
        };
        let value = translator.translate_expr(&analysis.ast)?;
        let value = match analysis.return_type {
            ReturnType::F64 => value,
            ReturnType::F32 => {
                let narrow = translator.builder.ins().fdemote(types::F32, value);
                translator.builder.ins().fpromote(types::F64, narrow)
            }
        };
        translator.builder.ins().return_(&[value]);
        translator.builder.finalize();

        trace!("cranelift IR for {}:\n{}", symbol, self.ctx.func.display());

        module
            .define_function(id, &mut self.ctx)
            .map_err(|e| e.to_string())?;
        module.clear_context(&mut self.ctx);

        // Resolve the relocations to the library symbols.
        module.finalize_definitions().map_err(|e| e.to_string())?;
        Ok(id)
    }

    /// Hand the module over to an artifact exporting the function `id`
    fn finish(mut self, id: FuncId) -> Result<Native, String> {
        let module = self.module.take().ok_or("session already finished")?;
        // SAFETY: `id` was declared with the `fn(f64) -> f64` signature and
        // the module's default calling convention, the C one of the host. The
        // code lives as long as the module, which the artifact owns.
        let code = unsafe { NativeCode::new(module.get_finalized_function(id)) };
        Ok(Native {
            module: Some(module),
            id,
            code,
            _live: Liveness::new(),
        })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(module) = self.module.take() {
            // SAFETY: no function of an unfinished session was handed out.
            unsafe { module.free_memory() };
        }
    }
}

/// A collection of state used for translating from ast nodes into Cranelift
/// IR.
struct FunctionTranslator<'a> {
    builder: FunctionBuilder<'a>,
    parameter: Value,
    module: &'a mut JITModule,
    /// Library functions already imported into the function
    functions: HashMap<&'static str, FuncRef>,
    intrinsics: bool,
}

impl<'a> FunctionTranslator<'a> {
    /// When you write out instructions in Cranelift, you get back `Value`s. You
    /// can then use these references in other instructions.
    fn translate_expr(&mut self, ast: &Ast) -> Result<Value, String> {
        let value = match *ast {
            Ast::Value(val) => self.builder.ins().f64const(val),
            Ast::Parameter => self.parameter,
            Ast::Neg(ref arg) => {
                let arg = self.translate_expr(arg)?;
                self.builder.ins().fneg(arg)
            }
            Ast::Add(ref left, ref right) => {
                let lhs = self.translate_expr(left)?;
                let rhs = self.translate_expr(right)?;
                self.builder.ins().fadd(lhs, rhs)
            }
            Ast::Sub(ref left, ref right) => {
                let lhs = self.translate_expr(left)?;
                let rhs = self.translate_expr(right)?;
                self.builder.ins().fsub(lhs, rhs)
            }
            Ast::Mul(ref left, ref right) => {
                let lhs = self.translate_expr(left)?;
                let rhs = self.translate_expr(right)?;
                self.builder.ins().fmul(lhs, rhs)
            }
            Ast::Div(ref left, ref right) => {
                let lhs = self.translate_expr(left)?;
                let rhs = self.translate_expr(right)?;
                self.builder.ins().fdiv(lhs, rhs)
            }
            Ast::Rem(ref left, ref right) => {
                let lhs = self.translate_expr(left)?;
                let rhs = self.translate_expr(right)?;
                self.translate_call(REM_SYMBOL, &[lhs, rhs])?
            }
            Ast::Exp(ref left, ref right) => {
                let lhs = self.translate_expr(left)?;
                let rhs = self.translate_expr(right)?;
                self.translate_call(POW_SYMBOL, &[lhs, rhs])?
            }
            Ast::Unary(export, ref arg) => {
                let arg = self.translate_expr(arg)?;
                match export.intrinsic {
                    Some(intrinsic) if self.intrinsics => self.translate_intrinsic(intrinsic, arg),
                    _ => self.translate_export(export, &[arg])?,
                }
            }
            Ast::Binary(export, ref left, ref right) => {
                let lhs = self.translate_expr(left)?;
                let rhs = self.translate_expr(right)?;
                self.translate_export(export, &[lhs, rhs])?
            }
        };
        Ok(value)
    }

    fn translate_intrinsic(&mut self, intrinsic: Intrinsic, arg: Value) -> Value {
        let ins = self.builder.ins();
        match intrinsic {
            Intrinsic::Sqrt => ins.sqrt(arg),
            Intrinsic::Abs => ins.fabs(arg),
            Intrinsic::Floor => ins.floor(arg),
            Intrinsic::Ceil => ins.ceil(arg),
            Intrinsic::Trunc => ins.trunc(arg),
        }
    }

    fn translate_export(&mut self, export: &'static Export, args: &[Value]) -> Result<Value, String> {
        if export.symbol.is_empty() {
            return Err(format!("library member {} is not a function", export.name));
        }
        self.translate_call(export.symbol, args)
    }

    fn translate_call(&mut self, name: &'static str, args: &[Value]) -> Result<Value, String> {
        let local_callee = match self.functions.get(name) {
            Some(&callee) => callee,
            None => {
                let mut sig = self.module.make_signature();

                // Add a parameter for each argument.
                for _arg in args {
                    sig.params.push(AbiParam::new(types::F64));
                }
                sig.returns.push(AbiParam::new(types::F64));

                let callee = self
                    .module
                    .declare_function(name, Linkage::Import, &sig)
                    .map_err(|e| e.to_string())?;
                let local_callee = self.module.declare_func_in_func(callee, self.builder.func);
                self.functions.insert(name, local_callee);
                local_callee
            }
        };

        let call = self.builder.ins().call(local_callee, args);
        Ok(self.builder.inst_results(call)[0])
    }
}

/// Artifact of the JIT: a finalized module and the function it exports
struct Native {
    module: Option<JITModule>,
    id: FuncId,
    code: NativeCode,
    _live: Liveness,
}

// SAFETY: the module is never mutated after finalization, and the generated
// code only calls the thread safe library functions.
unsafe impl Send for Native {}
unsafe impl Sync for Native {}

impl Artifact for Native {
    fn entry_point(&self, symbol: &str) -> Option<EntryPoint> {
        let module = self.module.as_ref()?;
        match module.get_name(symbol)? {
            FuncOrDataId::Func(id) if id == self.id => Some(EntryPoint::Native(self.code)),
            _ => None,
        }
    }

    fn call(&self, entry: EntryPoint, x: f64) -> f64 {
        match entry {
            // SAFETY: the code is the one of this module, alive with `self`.
            EntryPoint::Native(code) if code == self.code => unsafe { code.call(x) },
            _ => f64::NAN,
        }
    }
}

impl Drop for Native {
    fn drop(&mut self) {
        if let Some(module) = self.module.take() {
            // SAFETY: the code is only ever run through `call`, or by the
            // CompiledFunction owning this artifact, which is being dropped.
            unsafe { module.free_memory() };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Jit;
    use crate::backend::{interp, Backend, CompileOptions, EntryPoint};
    use crate::frontend::analyze;
    use crate::unit::{CodeUnit, ReturnType};
    use test_case::test_case;

    fn run_with(body: &str, x: f64, options: &CompileOptions) -> f64 {
        let unit = CodeUnit::build(body, options.return_type);
        let compilation = Jit.compile(&unit, options).unwrap();
        let entry = compilation.artifact.entry_point(&unit.symbol()).unwrap();
        assert!(matches!(entry, EntryPoint::Native(_)));
        compilation.artifact.call(entry, x)
    }

    fn run(body: &str, x: f64) -> f64 {
        run_with(body, x, &CompileOptions::default())
    }

    #[test_case("3 + 5", 0.0 => 8.0 ; "constant")]
    #[test_case("x", 4.5 => 4.5 ; "parameter")]
    #[test_case("x * 2 - 1", 3.0 => 5.0 ; "arithmetic")]
    #[test_case("-x ^ 2", 3.0 => -9.0 ; "negated power")]
    #[test_case("x % 4", 7.0 => 3.0 ; "remainder")]
    #[test_case("math::sqrt(x)", 16.0 => 4.0 ; "intrinsic")]
    #[test_case("math::abs(x) + math::floor(x)", -2.5 => -0.5 ; "several intrinsics")]
    #[test_case("math::pow(x, 2) + math::pow(x, 3)", 2.0 => 12.0 ; "library call used twice")]
    #[test_case("math::max(x, 10)", 3.0 => 10.0 ; "binary call")]
    #[test_case("1 / x", 0.0 => f64::INFINITY ; "division by zero")]
    fn native(body: &str, x: f64) -> f64 {
        run(body, x)
    }

    #[test]
    fn without_optimization() {
        let options = CompileOptions {
            optimize: false,
            ..CompileOptions::default()
        };
        assert_eq!(run_with("math::sqrt(x) + 2 * 3", 4.0, &options), 8.0);
    }

    #[test]
    fn single_precision() {
        let options = CompileOptions {
            return_type: ReturnType::F32,
            ..CompileOptions::default()
        };
        assert_eq!(run_with("x / 10", 1.0, &options), f64::from(0.1_f32));
    }

    #[test]
    fn matches_interpreter() {
        let formulas = [
            "math::sin(x) * math::cos(x) + math::tan(x / 3)",
            "math::exp(-x) ^ 0.5 - math::log(x + 2)",
            "math::atan2(x, 2) % 0.3",
            "math::cbrt(x) + math::sinh(x) - math::round(x * 1.5)",
            "math::sign(x - 1) * math::min(x, math::E)",
        ];
        let options = CompileOptions::default();
        for formula in &formulas {
            let unit = CodeUnit::build(formula, ReturnType::F64);
            let analysis = analyze(&unit, &options).unwrap();
            for &x in &[-1.5, 0.0, 0.25, 1.0, 3.75] {
                let expected = interp::eval(&analysis.ast, x);
                let actual = run(formula, x);
                assert!(
                    expected.to_bits() == actual.to_bits() || (expected.is_nan() && actual.is_nan()),
                    "{} at {}: {} != {}",
                    formula,
                    x,
                    actual,
                    expected
                );
            }
        }
    }

    #[test]
    fn unknown_symbol() {
        let unit = CodeUnit::build("x", ReturnType::F64);
        let compilation = Jit.compile(&unit, &CompileOptions::default()).unwrap();
        assert!(compilation.artifact.entry_point("main").is_none());
    }

    #[test]
    fn entry_points_stay_with_their_artifact() {
        let options = CompileOptions::default();
        let other_unit = CodeUnit::build("x * 2 + 1", ReturnType::F64);
        let other = Jit.compile(&other_unit, &options).unwrap();
        let other_entry = other.artifact.entry_point(&other_unit.symbol()).unwrap();

        let unit = CodeUnit::build("x", ReturnType::F64);
        let compilation = Jit.compile(&unit, &options).unwrap();
        let entry = compilation.artifact.entry_point(&unit.symbol()).unwrap();
        assert_ne!(entry, other_entry);
        assert!(compilation.artifact.call(other_entry, 3.0).is_nan());
        assert!(compilation.artifact.call(EntryPoint::Interpreted(0), 3.0).is_nan());
        assert_eq!(compilation.artifact.call(entry, 3.0), 3.0);

        drop(other);
        assert!(compilation.artifact.call(other_entry, 3.0).is_nan());
    }

    #[test]
    fn front_end_errors() {
        let unit = CodeUnit::build("banana(x) +", ReturnType::F64);
        let diagnostics = Jit.compile(&unit, &CompileOptions::default()).err().unwrap();
        assert!(diagnostics.has_errors());
    }
}
