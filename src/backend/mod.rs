//! Code generation backends.
//!
//! A backend turns a [`CodeUnit`] into an in-memory [`Artifact`], or into the
//! diagnostics explaining why it could not. The compiler only talks to this
//! interface, so the JIT can be swapped for the interpreter, or for anything
//! else able to run a unit.

mod interp;
mod jit;

pub use interp::Interpreter;
pub use jit::Jit;

use crate::diagnostic::Diagnostics;
use crate::rewrite::RewriteStrategy;
use crate::unit::{CodeUnit, ReturnType};
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Options of a compilation. The defaults are the configuration formulas are
/// meant to be compiled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Fold constants, and let the backend optimize the generated code
    pub optimize: bool,
    /// Report every warning as an error
    pub warnings_as_errors: bool,
    /// Type the result of every formula is cast to
    pub return_type: ReturnType,
    /// How vocabulary names are found in formulas
    pub rewrite: RewriteStrategy,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            optimize: true,
            warnings_as_errors: true,
            return_type: ReturnType::F64,
            rewrite: RewriteStrategy::Tokens,
        }
    }
}

/// A callable symbol inside of an artifact. Only meaningful together with the
/// artifact it was found in, and only while that artifact is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    /// Machine code following the C calling convention
    Native(NativeCode),
    /// A function the artifact evaluates itself, by index
    Interpreted(usize),
}

/// Address of a generated `extern "C" fn(f64) -> f64`.
///
/// The address cannot be called from outside of the crate: the code it
/// points to is only run by [`Artifact::call`] on the artifact owning it, or
/// by the [`CompiledFunction`](crate::CompiledFunction) holding that artifact.
/// An entry point kept after its artifact was dropped is therefore harmless.
///
/// ```compile_fail
/// # use calcfn::{Backend, CodeUnit, CompileOptions, EntryPoint, Jit, ReturnType};
/// let unit = CodeUnit::build("x * 2", ReturnType::F64);
/// let compilation = Jit.compile(&unit, &CompileOptions::default()).unwrap();
/// if let Some(EntryPoint::Native(code)) = compilation.artifact.entry_point(&unit.symbol()) {
///     drop(compilation);
///     code(3.0);
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeCode(*const u8);

// SAFETY: the address is never dereferenced outside of `call`, whose callers
// guarantee the code is alive. Generated code has no thread affinity.
unsafe impl Send for NativeCode {}
unsafe impl Sync for NativeCode {}

impl NativeCode {
    /// Wrap the address of generated code.
    ///
    /// # Safety
    ///
    /// `address` must be the start of a function with the
    /// `extern "C" fn(f64) -> f64` signature, which stays valid for as long
    /// as the artifact handing out this entry point is alive.
    #[must_use]
    pub unsafe fn new(address: *const u8) -> Self {
        Self(address)
    }

    /// Run the code.
    ///
    /// # Safety
    ///
    /// The artifact this address belongs to must still be alive.
    pub(crate) unsafe fn call(self, x: f64) -> f64 {
        let function = mem::transmute::<*const u8, extern "C" fn(f64) -> f64>(self.0);
        function(x)
    }
}

/// Something a backend produced and that can run code units
pub trait Artifact: Send + Sync {
    /// Find an exported function by symbol
    fn entry_point(&self, symbol: &str) -> Option<EntryPoint>;

    /// Run an entry point of this artifact. Native code of another artifact
    /// is never run: it evaluates to NaN.
    fn call(&self, entry: EntryPoint, x: f64) -> f64;
}

/// A successful compilation
pub struct Compilation {
    pub artifact: Box<dyn Artifact>,
    /// Warnings that did not prevent compilation
    pub warnings: Diagnostics,
}

/// A compiler service able to turn code units into artifacts
pub trait Backend: Send + Sync {
    /// Short name, for logs
    fn name(&self) -> &'static str;

    /// Compile `unit`. Must not return an artifact if any error was reported.
    fn compile(&self, unit: &CodeUnit, options: &CompileOptions) -> Result<Compilation, Diagnostics>;
}

static LIVE_ARTIFACTS: AtomicUsize = AtomicUsize::new(0);

/// Number of artifacts currently alive in the process, for every backend.
///
/// Each successful compilation adds one, dropping the resulting
/// [`CompiledFunction`](crate::CompiledFunction) removes it again.
#[must_use]
pub fn live_artifacts() -> usize {
    LIVE_ARTIFACTS.load(Ordering::SeqCst)
}

/// Counts an artifact as alive for as long as it is held
#[derive(Debug)]
pub(crate) struct Liveness(());

impl Liveness {
    pub(crate) fn new() -> Self {
        LIVE_ARTIFACTS.fetch_add(1, Ordering::SeqCst);
        Self(())
    }
}

impl Drop for Liveness {
    fn drop(&mut self) {
        LIVE_ARTIFACTS.fetch_sub(1, Ordering::SeqCst);
    }
}
