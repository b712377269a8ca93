//! IL Functions and Programs
//!
//! A [`Function`] owns its instruction sequence together with the arenas for
//! its variables and labels; a [`Program`] owns its functions, the external
//! function table, and the entry-function reference. Instructions refer to
//! arena items through plain index handles ([`VarId`], [`LabelId`],
//! [`FunId`], [`ExtId`]), so the model has no interior pointers and can be
//! rewritten freely by the spiller.
//!
//! Rendering lives here too: the `render_*` methods print the concrete
//! syntax accepted by the front end, so printed programs re-parse to
//! themselves.

use super::instr::Instruction;
use super::scope::Scope;
use super::value::{Node, Value};
use crate::common::span::Span;

/// Handle of a variable in its function's arena
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub u32);

/// Handle of a label in its function's arena
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LabelId(pub u32);

/// Handle of an IL function in its program's arena
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FunId(pub u32);

/// Handle of an external function in its program's arena
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExtId(pub u32);

#[derive(Clone, Debug)]
struct VarInfo {
    name: String,
    /// Cleared on variables the spiller introduces, so they are never
    /// spilled again
    spillable: bool,
}

/// A function defined outside the IL, referenced by bare name
#[derive(Clone, Debug)]
pub struct ExternalFunction {
    pub name: String,
    /// Declared argument count; -1 means variadic
    pub num_arguments: i64,
    /// Calls to this function never return to the call site
    pub never_returns: bool,
}

impl ExternalFunction {
    pub fn new(name: &str, num_arguments: i64, never_returns: bool) -> Self {
        ExternalFunction {
            name: name.to_string(),
            num_arguments,
            never_returns,
        }
    }
}

/// An IL function: a name, a declared argument count, and an instruction
/// sequence over the function's own variable and label namespaces
#[derive(Clone, Debug)]
pub struct Function {
    name: String,
    pub num_arguments: i64,
    pub instructions: Vec<Instruction>,
    vars: Vec<VarInfo>,
    var_scope: Scope<VarId>,
    labels: Vec<String>,
    label_scope: Scope<LabelId>,
    next_spill_slot: usize,
}

impl Function {
    pub fn new(name: &str, num_arguments: i64) -> Self {
        Function {
            name: name.to_string(),
            num_arguments,
            instructions: Vec::new(),
            vars: Vec::new(),
            var_scope: Scope::new(),
            labels: Vec::new(),
            label_scope: Scope::new(),
            next_spill_slot: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // --- variables ---

    /// Look up an existing variable or materialize one; variables may be
    /// used without prior declaration
    pub fn get_or_create_var(&mut self, name: &str) -> VarId {
        if let Some(id) = self.var_scope.lookup(name) {
            return id;
        }
        let id = VarId(self.vars.len() as u32);
        self.vars.push(VarInfo {
            name: name.to_string(),
            spillable: true,
        });
        self.var_scope.add_bound(name, id);
        id
    }

    pub fn lookup_var(&self, name: &str) -> Option<VarId> {
        self.var_scope.lookup(name)
    }

    pub fn var_name(&self, var: VarId) -> &str {
        &self.vars[var.0 as usize].name
    }

    pub fn is_spillable(&self, var: VarId) -> bool {
        self.vars[var.0 as usize].spillable
    }

    pub fn set_spillable(&mut self, var: VarId, spillable: bool) {
        self.vars[var.0 as usize].spillable = spillable;
    }

    pub fn mark_all_spillable(&mut self) {
        for info in &mut self.vars {
            info.spillable = true;
        }
    }

    pub fn var_ids(&self) -> impl Iterator<Item = VarId> + use<> {
        (0..self.vars.len() as u32).map(VarId)
    }

    pub fn var_names(&self) -> impl Iterator<Item = &str> {
        self.vars.iter().map(|info| info.name.as_str())
    }

    // --- labels ---

    /// Record a reference to a label that need not be defined yet
    pub fn reference_label(&mut self, name: &str, span: Span) -> LabelId {
        if let Some(id) = self.label_scope.lookup(name) {
            return id;
        }
        let id = self.push_label(name);
        self.label_scope.add_pending(name, id, span);
        id
    }

    /// Define a label; `Err` carries the handle of the previous definition
    pub fn define_label(&mut self, name: &str) -> Result<LabelId, LabelId> {
        if let Some(existing) = self.label_scope.lookup(name) {
            if self.label_scope.is_defined(name) {
                return Err(existing);
            }
            self.label_scope.promote(name);
            return Ok(existing);
        }
        let id = self.push_label(name);
        self.label_scope.add_bound(name, id);
        Ok(id)
    }

    fn push_label(&mut self, name: &str) -> LabelId {
        let id = LabelId(self.labels.len() as u32);
        self.labels.push(name.to_string());
        id
    }

    pub fn label_name(&self, label: LabelId) -> &str {
        &self.labels[label.0 as usize]
    }

    /// Labels referenced but never defined, with the span of the first
    /// reference
    pub fn undefined_labels(&self) -> impl Iterator<Item = (&str, Span)> {
        self.label_scope.pending().map(|(name, _, span)| (name, span))
    }

    // --- spill slots ---

    /// Claim the next free 8-byte spill slot off `rsp`
    pub fn alloc_spill_slot(&mut self) -> usize {
        let slot = self.next_spill_slot;
        self.next_spill_slot += 1;
        slot
    }

    pub fn spill_slots(&self) -> usize {
        self.next_spill_slot
    }

    /// Concrete-syntax token for a variable-like node (`%x` or `rax`)
    pub fn render_node(&self, node: Node) -> String {
        match node {
            Node::Reg(reg) => reg.name().to_string(),
            Node::Var(var) => format!("%{}", self.var_name(var)),
        }
    }
}

/// A whole IL program: the entry-function reference, the IL functions, and
/// the external function table
#[derive(Clone, Debug)]
pub struct Program {
    entry: Option<FunId>,
    functions: Vec<Function>,
    fun_scope: Scope<FunId>,
    externals: Vec<ExternalFunction>,
    ext_scope: Scope<ExtId>,
}

impl Program {
    /// Create an empty program with the builtin externals registered
    pub fn new() -> Self {
        let mut program = Program {
            entry: None,
            functions: Vec::new(),
            fun_scope: Scope::new(),
            externals: Vec::new(),
            ext_scope: Scope::new(),
        };
        for (name, num_arguments, never_returns) in [
            ("print", 1, false),
            ("input", 0, false),
            ("allocate", 2, false),
            ("tensor-error", 3, true),
            ("tuple-error", -1, true),
        ] {
            program.add_external(ExternalFunction::new(name, num_arguments, never_returns));
        }
        program
    }

    fn add_external(&mut self, external: ExternalFunction) {
        let id = ExtId(self.externals.len() as u32);
        self.ext_scope.add_bound(&external.name, id);
        self.externals.push(external);
    }

    // --- functions ---

    /// Record a reference to an IL function that need not be defined yet.
    /// The referent is allocated eagerly so the returned handle stays valid.
    pub fn reference_function(&mut self, name: &str, span: Span) -> FunId {
        if let Some(id) = self.fun_scope.lookup(name) {
            return id;
        }
        let id = FunId(self.functions.len() as u32);
        self.functions.push(Function::new(name, 0));
        self.fun_scope.add_pending(name, id, span);
        id
    }

    /// Define an IL function; `Err` carries the handle of the previous
    /// definition
    pub fn define_function(&mut self, name: &str) -> Result<FunId, FunId> {
        if let Some(existing) = self.fun_scope.lookup(name) {
            if self.fun_scope.is_defined(name) {
                return Err(existing);
            }
            self.fun_scope.promote(name);
            return Ok(existing);
        }
        let id = FunId(self.functions.len() as u32);
        self.functions.push(Function::new(name, 0));
        self.fun_scope.add_bound(name, id);
        Ok(id)
    }

    /// Functions referenced but never defined, with the span of the first
    /// reference
    pub fn undefined_functions(&self) -> impl Iterator<Item = (&str, Span)> {
        self.fun_scope.pending().map(|(name, _, span)| (name, span))
    }

    pub fn set_entry(&mut self, entry: FunId) {
        self.entry = Some(entry);
    }

    pub fn entry(&self) -> FunId {
        self.entry.expect("program has no entry function")
    }

    pub fn function(&self, id: FunId) -> &Function {
        &self.functions[id.0 as usize]
    }

    pub fn function_mut(&mut self, id: FunId) -> &mut Function {
        &mut self.functions[id.0 as usize]
    }

    /// Move a function out of the arena for construction or rewriting,
    /// leaving a stub behind; pair with [`Program::put_function`]
    pub fn take_function(&mut self, id: FunId) -> Function {
        let name = self.functions[id.0 as usize].name.clone();
        std::mem::replace(&mut self.functions[id.0 as usize], Function::new(&name, 0))
    }

    pub fn put_function(&mut self, id: FunId, function: Function) {
        self.functions[id.0 as usize] = function;
    }

    pub fn fun_ids(&self) -> impl Iterator<Item = FunId> + use<> {
        (0..self.functions.len() as u32).map(FunId)
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter()
    }

    // --- externals ---

    pub fn lookup_external(&self, name: &str) -> Option<ExtId> {
        self.ext_scope.lookup(name)
    }

    pub fn external(&self, id: ExtId) -> &ExternalFunction {
        &self.externals[id.0 as usize]
    }

    // --- rendering ---

    pub fn render_value(&self, fun: &Function, value: &Value) -> String {
        match value {
            Value::Register(reg) => reg.name().to_string(),
            Value::Variable(var) => format!("%{}", fun.var_name(*var)),
            Value::Number(n) => n.to_string(),
            Value::Label(label) => format!(":{}", fun.label_name(*label)),
            Value::IlFunction(id) => format!("@{}", self.function(*id).name()),
            Value::External(id) => self.external(*id).name.clone(),
            Value::StackArg(n) => format!("stack-arg {}", n),
            Value::Memory { base, offset } => {
                format!("mem {} {}", self.render_value(fun, base), offset)
            }
        }
    }

    pub fn render_instruction(&self, fun: &Function, inst: &Instruction) -> String {
        match inst {
            Instruction::Return => "return".to_string(),
            Instruction::Assign { op, dest, source } => format!(
                "{} {} {}",
                self.render_value(fun, dest),
                op.token(),
                self.render_value(fun, source)
            ),
            Instruction::CompareAssign { dest, lhs, op, rhs } => format!(
                "{} <- {} {} {}",
                self.render_value(fun, dest),
                self.render_value(fun, lhs),
                op.token(),
                self.render_value(fun, rhs)
            ),
            Instruction::CompareJump {
                lhs,
                op,
                rhs,
                target,
            } => format!(
                "cjump {} {} {} :{}",
                self.render_value(fun, lhs),
                op.token(),
                self.render_value(fun, rhs),
                fun.label_name(*target)
            ),
            Instruction::Label(label) => format!(":{}", fun.label_name(*label)),
            Instruction::Goto(label) => format!("goto :{}", fun.label_name(*label)),
            Instruction::Call { callee, arity } => {
                format!("call {} {}", self.render_value(fun, callee), arity)
            }
            Instruction::Lea {
                dest,
                base,
                offset,
                scale,
            } => format!(
                "{} @ {} {} {}",
                self.render_value(fun, dest),
                self.render_value(fun, base),
                self.render_value(fun, offset),
                scale
            ),
        }
    }

    pub fn render_function(&self, fun: &Function) -> String {
        let mut result = format!("(@{} {}", fun.name(), fun.num_arguments);
        for inst in &fun.instructions {
            result.push('\n');
            result.push_str(&self.render_instruction(fun, inst));
        }
        result.push_str("\n)");
        result
    }

    /// The whole program in concrete syntax
    pub fn render(&self) -> String {
        let mut result = format!("(@{}", self.function(self.entry()).name());
        for fun in &self.functions {
            result.push('\n');
            result.push_str(&self.render_function(fun));
        }
        result.push_str("\n)\n");
        result
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}
