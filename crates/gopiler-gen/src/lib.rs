//! gopiler-gen — the code generator (spec.md §4.6, component C6).
//!
//! Walks the AST built by [`gopiler_sem`] and emits a 256-byte machine
//! image for the 6502 subset in spec.md §4.6, plus a parallel mnemonic
//! assembly listing, with backpatched placeholder addresses for every
//! declared variable and every anonymous intermediate value.
//!
//! There is no teacher counterpart for this module — `faxc-gen` targets
//! LLVM IR, not a flat byte image — so the emission rules below are
//! grounded directly on spec.md §4.6's per-node-kind description rather
//! than on any example repo (see DESIGN.md).

pub mod error;
mod image;
mod placeholder;

pub use error::{GenError, Result};
pub use image::{Image, SCRATCH_ADDR};
pub use placeholder::{Placeholder, PlaceholderId};

use rustc_hash::{FxHashMap, FxHashSet};

use gopiler_sem::{AstKind, AstNode, DataType, ScopeId, SymbolTableTree};
use gopiler_util::{Counters, Diagnostics, Idx, IndexVec};

/// A default "padded-break" immediate a freshly declared string variable
/// is initialized to before it is ever assigned — not a valid heap
/// address, just a known sentinel byte (spec.md §4.6 "VarDecl").
const STRING_DEFAULT_IMM: u8 = 0xFE;

/// Outcome of generating code for one program.
pub struct CodeGenOutcome {
    pub image: Option<Image>,
    pub assembly: Option<String>,
    pub counters: Counters,
}

/// Generates machine code and assembly for one program's AST and symbol
/// table tree. `ast`/`symbols` being `None` means semantic analysis
/// already failed this program (spec.md §4.5's closing rule); this pass
/// is then skipped entirely, matching every other pass's boundary case.
pub fn generate(
    ast: Option<&AstNode>,
    symbols: Option<&SymbolTableTree>,
    diag: &Diagnostics,
    program_num: usize,
) -> CodeGenOutcome {
    let (Some(ast), Some(symbols)) = (ast, symbols) else {
        return CodeGenOutcome {
            image: None,
            assembly: None,
            counters: Counters::default(),
        };
    };

    diag.info(
        "GOPILER",
        &format!("Generating code for program {program_num}"),
    );
    diag.debug("CODE GENERATOR", "Walking AST to emit machine code...");

    let mut gen = CodeGenerator {
        image: Image::new(),
        asm: String::new(),
        placeholders: IndexVec::new(),
        var_placeholders: FxHashMap::default(),
        symbols,
        used_scopes: FxHashSet::default(),
        cur_scope: symbols.root(),
    };

    let mut counters = Counters::default();
    match gen.run(ast) {
        Ok(()) => {
            diag.pass(
                "CODE GENERATOR",
                &format!("Code generator successfully evaluated program {program_num}."),
            );
            CodeGenOutcome {
                image: Some(gen.image),
                assembly: Some(gen.asm),
                counters,
            }
        }
        Err(err) => {
            counters.record_error();
            diag.error("CODE GENERATOR", &err.to_string());
            diag.fail(
                "CODE GENERATOR",
                &format!("Code generation failed for program {program_num} with 1 error(s)."),
            );
            diag.info(
                "GOPILER",
                &format!(
                    "Compilation of program {program_num} aborted due to code generation error."
                ),
            );
            CodeGenOutcome {
                image: None,
                assembly: None,
                counters,
            }
        }
    }
}

struct BneFixup {
    operand_off: usize,
    asm_off: usize,
}

struct CodeGenerator<'a> {
    image: Image,
    asm: String,
    placeholders: IndexVec<PlaceholderId, Placeholder>,
    /// One entry per declared variable, keyed by the scope that actually
    /// owns it (not the scope it's referenced from) and its name.
    var_placeholders: FxHashMap<(ScopeId, char), PlaceholderId>,
    symbols: &'a SymbolTableTree,
    /// Scopes already handed out by the scope chooser (spec.md §4.6).
    used_scopes: FxHashSet<ScopeId>,
    cur_scope: ScopeId,
}

impl<'a> CodeGenerator<'a> {
    fn run(&mut self, ast: &AstNode) -> Result<()> {
        let AstKind::Block(stmts) = &ast.kind else {
            return Err(GenError::Internal(
                "program AST root is always a Block".into(),
            ));
        };
        // The root Block reuses the symbol table's root scope directly
        // (spec.md §4.6: "except the root"); only nested Blocks go
        // through the scope chooser.
        for stmt in stmts {
            self.gen_stmt(stmt)?;
        }
        self.emit_brk()?;
        self.backpatch()?;
        Ok(())
    }

    /// Descends to the first child of `parent` not yet in `used_scopes`
    /// and marks it used (spec.md §4.6 "Scope chooser"). Each child scope
    /// in the semantic analyzer's tree is entered at most once, in the
    /// same left-to-right order the AST was checked in (spec.md §3
    /// invariant (d)).
    fn choose_child_scope(&mut self, parent: ScopeId) -> Result<ScopeId> {
        for &child in self.symbols.children(parent) {
            if !self.used_scopes.contains(&child) {
                self.used_scopes.insert(child);
                return Ok(child);
            }
        }
        Err(GenError::Internal(
            "no unused child scope left for a nested Block".into(),
        ))
    }

    fn gen_stmt(&mut self, node: &AstNode) -> Result<()> {
        match &node.kind {
            AstKind::Block(stmts) => {
                let new_scope = self.choose_child_scope(self.cur_scope)?;
                let old_scope = self.cur_scope;
                self.cur_scope = new_scope;
                for stmt in stmts {
                    self.gen_stmt(stmt)?;
                }
                self.cur_scope = old_scope;
                Ok(())
            }
            AstKind::VarDecl { ty, name } => self.gen_var_decl(*ty, *name),
            AstKind::Assign { name, expr } => self.gen_assign(*name, expr),
            AstKind::Print(expr) => self.gen_print(expr),
            AstKind::If { cond, block } => self.gen_if(cond, block),
            AstKind::While { cond, block } => self.gen_while(cond, block),
            other => Err(GenError::Internal(format!("not a statement: {other:?}"))),
        }
    }

    fn gen_var_decl(&mut self, ty: DataType, name: char) -> Result<()> {
        let placeholder = self.placeholders.push(Placeholder::default());
        self.var_placeholders
            .insert((self.cur_scope, name), placeholder);
        let imm = match ty {
            DataType::Int | DataType::Boolean => 0x00,
            DataType::String => STRING_DEFAULT_IMM,
        };
        self.emit_imm_instr("LDA", 0xA9, imm)?;
        self.emit_addr_instr("STA", 0x8D, placeholder)?;
        Ok(())
    }

    fn gen_assign(&mut self, name: char, expr: &AstNode) -> Result<()> {
        let placeholder = self.resolve_var_placeholder(name)?;

        // Peephole: `x = 1 + x` becomes INC x (spec.md §4.6
        // "AssignmentStatement"; spec.md §8 scenario 4).
        if let AstKind::Addition { digit, rhs } = &expr.kind {
            if *digit == 1 {
                if let AstKind::IdRef(rhs_name) = &rhs.kind {
                    if *rhs_name == name {
                        self.emit_addr_instr("INC", 0xEE, placeholder)?;
                        return Ok(());
                    }
                }
            }
        }

        self.gen_expr_to_acc(expr)?;
        self.emit_addr_instr("STA", 0x8D, placeholder)?;
        Ok(())
    }

    fn gen_print(&mut self, expr: &AstNode) -> Result<()> {
        match &expr.kind {
            AstKind::DigitLit(d) => {
                self.emit_imm_instr("LDY", 0xA0, *d)?;
                self.emit_imm_instr("LDX", 0xA2, 0x01)?;
            }
            AstKind::BoolLit(b) => {
                self.emit_imm_instr("LDY", 0xA0, if *b { 1 } else { 0 })?;
                self.emit_imm_instr("LDX", 0xA2, 0x01)?;
            }
            AstKind::StringLit(s) => {
                let addr = self.image.push_string(s)?;
                self.emit_imm_instr("LDY", 0xA0, addr)?;
                self.emit_imm_instr("LDX", 0xA2, 0x02)?;
            }
            AstKind::IdRef(name) => {
                let (found_scope, ty) = self.lookup_entry(*name)?;
                let placeholder = *self
                    .var_placeholders
                    .get(&(found_scope, *name))
                    .ok_or_else(|| {
                        GenError::Internal(format!("no placeholder declared for '{name}'"))
                    })?;
                self.emit_addr_instr("LDY", 0xAC, placeholder)?;
                let code = if ty == DataType::String { 0x02 } else { 0x01 };
                self.emit_imm_instr("LDX", 0xA2, code)?;
            }
            AstKind::Addition { .. } | AstKind::Equality(..) | AstKind::Inequality(..) => {
                self.gen_expr_to_acc(expr)?;
                let anon = self.placeholders.push(Placeholder::default());
                self.emit_addr_instr("STA", 0x8D, anon)?;
                self.emit_addr_instr("LDY", 0xAC, anon)?;
                self.emit_imm_instr("LDX", 0xA2, 0x01)?;
            }
            other => return Err(GenError::Internal(format!("not printable: {other:?}"))),
        }
        self.emit_sys()
    }

    fn gen_if(&mut self, cond: &AstNode, block: &AstNode) -> Result<()> {
        self.gen_expr_to_acc(cond)?;
        self.emit_fixed_addr_instr("STA", 0x8D, SCRATCH_ADDR)?;
        self.emit_imm_instr("LDX", 0xA2, 0x01)?;
        self.emit_fixed_addr_instr("CPX", 0xEC, SCRATCH_ADDR)?;
        let fixup = self.reserve_bne()?;
        self.gen_stmt(block)?;
        let distance = self.forward_distance(&fixup)?;
        self.patch_bne(fixup, distance);
        Ok(())
    }

    fn gen_while(&mut self, cond: &AstNode, block: &AstNode) -> Result<()> {
        let cond_start = self.image.cur_byte_ptr;
        self.gen_expr_to_acc(cond)?;
        self.emit_fixed_addr_instr("STA", 0x8D, SCRATCH_ADDR)?;
        self.emit_imm_instr("LDX", 0xA2, 0x01)?;
        self.emit_fixed_addr_instr("CPX", 0xEC, SCRATCH_ADDR)?;
        let exit_fixup = self.reserve_bne()?;
        self.gen_stmt(block)?;

        // Force Z=0 (mem[$00FF] := 1, X := 0, so CPX always reports
        // "not equal") and branch back to the condition (spec.md §4.6
        // "WhileStatement").
        self.emit_imm_instr("LDA", 0xA9, 0x01)?;
        self.emit_fixed_addr_instr("STA", 0x8D, SCRATCH_ADDR)?;
        self.emit_imm_instr("LDX", 0xA2, 0x00)?;
        self.emit_fixed_addr_instr("CPX", 0xEC, SCRATCH_ADDR)?;
        let back_fixup = self.reserve_bne()?;
        let after_back_operand = back_fixup.operand_off + 1;
        let jump_dist = (after_back_operand - cond_start) as u16;
        // spec.md §9 Open Question: the displacement is only
        // representable in BNE's signed 8-bit operand up to 0x80; beyond
        // that, report it as a codegen error instead of wrapping silently.
        if jump_dist > 0x80 {
            return Err(GenError::LoopBodyTooLarge(jump_dist));
        }
        let back_distance = (0x100u16 - jump_dist) as u8;
        self.patch_bne(back_fixup, back_distance);

        let exit_distance = self.forward_distance(&exit_fixup)?;
        self.patch_bne(exit_fixup, exit_distance);
        Ok(())
    }

    /// The collapsed form of a right-skewed `Addition` chain: sum every
    /// digit leaf (wrapping at 8 bits), collect every identifier leaf,
    /// then `LDA #$<sum>` followed by one `ADC <id>` per identifier
    /// (spec.md §4.6 "Addition collapsing").
    fn gen_addition(&mut self, node: &AstNode) -> Result<()> {
        let mut sum: u8 = 0;
        let mut ids: Vec<char> = Vec::new();
        let mut cur = node;
        loop {
            match &cur.kind {
                AstKind::Addition { digit, rhs } => {
                    sum = sum.wrapping_add(*digit);
                    cur = rhs;
                }
                AstKind::DigitLit(d) => {
                    sum = sum.wrapping_add(*d);
                    break;
                }
                AstKind::IdRef(name) => {
                    ids.push(*name);
                    break;
                }
                other => {
                    return Err(GenError::Internal(format!(
                        "addition chain ended in a non-int node: {other:?}"
                    )))
                }
            }
        }
        self.emit_imm_instr("LDA", 0xA9, sum)?;
        for name in ids {
            let placeholder = self.resolve_var_placeholder(name)?;
            self.emit_addr_instr("ADC", 0x6D, placeholder)?;
        }
        Ok(())
    }

    /// `<Equality>`/`<Inequality>` (spec.md §4.6 "Comparison"). Lowers `l`
    /// into the accumulator and stashes it in an anonymous placeholder,
    /// lowers `r` into the accumulator and stashes it at the scratch
    /// cell, then compares and branches to load `positive` or `negative`.
    /// The inner/outer branch displacements are computed exactly (the
    /// number of bytes to the landing point) rather than the fixed
    /// `0x0E`/`0x02` spec.md's prose names for the typical case — see
    /// DESIGN.md's Open Question note.
    fn gen_comparison(&mut self, l: &AstNode, r: &AstNode, positive: u8, negative: u8) -> Result<()> {
        self.gen_expr_to_acc(l)?;
        let anon_l = self.placeholders.push(Placeholder::default());
        self.emit_addr_instr("STA", 0x8D, anon_l)?;

        self.gen_expr_to_acc(r)?;
        self.emit_fixed_addr_instr("STA", 0x8D, SCRATCH_ADDR)?;
        self.emit_fixed_addr_instr("LDX", 0xAE, SCRATCH_ADDR)?;
        self.emit_addr_instr("CPX", 0xEC, anon_l)?;

        let outer = self.reserve_bne()?;
        self.emit_imm_instr("LDA", 0xA9, positive)?;
        self.emit_imm_instr("LDX", 0xA2, 0x01)?;
        let inner = self.reserve_bne()?;
        // The outer branch's target is the start of the negative-load
        // block, i.e. right here — before "LDA negative" is emitted.
        // Snapshot it now; `forward_distance` reads the cursor at call
        // time, and emitting "LDA negative" below would move it past
        // the target if read afterward.
        let outer_target = self.image.cur_byte_ptr;
        self.emit_imm_instr("LDA", 0xA9, negative)?;

        let inner_distance = self.forward_distance(&inner)?;
        self.patch_bne(inner, inner_distance);
        let outer_distance = self.branch_distance_to(&outer, outer_target)?;
        self.patch_bne(outer, outer_distance);
        Ok(())
    }

    fn gen_expr_to_acc(&mut self, node: &AstNode) -> Result<()> {
        match &node.kind {
            AstKind::DigitLit(d) => self.emit_imm_instr("LDA", 0xA9, *d),
            AstKind::BoolLit(b) => self.emit_imm_instr("LDA", 0xA9, if *b { 1 } else { 0 }),
            AstKind::StringLit(s) => {
                let addr = self.image.push_string(s)?;
                self.emit_imm_instr("LDA", 0xA9, addr)
            }
            AstKind::IdRef(name) => {
                let placeholder = self.resolve_var_placeholder(*name)?;
                self.emit_addr_instr("LDA", 0xAD, placeholder)
            }
            AstKind::Addition { .. } => self.gen_addition(node),
            AstKind::Equality(l, r) => self.gen_comparison(l, r, 1, 0),
            AstKind::Inequality(l, r) => self.gen_comparison(l, r, 0, 1),
            other => Err(GenError::Internal(format!("not an expression: {other:?}"))),
        }
    }

    fn lookup_entry(&self, name: char) -> Result<(ScopeId, DataType)> {
        let (scope, entry) = self.symbols.lookup(self.cur_scope, name).ok_or_else(|| {
            GenError::Internal(format!("undeclared id '{name}' reached code generation"))
        })?;
        Ok((scope, entry.ty))
    }

    fn resolve_var_placeholder(&self, name: char) -> Result<PlaceholderId> {
        let (found_scope, _) = self.lookup_entry(name)?;
        self.var_placeholders
            .get(&(found_scope, name))
            .copied()
            .ok_or_else(|| GenError::Internal(format!("no placeholder declared for '{name}'")))
    }

    fn emit_imm_instr(&mut self, mnemonic: &str, opcode: u8, imm: u8) -> Result<()> {
        self.image.emit_byte(opcode)?;
        self.image.emit_byte(imm)?;
        self.asm.push_str(&format!("{mnemonic} #${imm:02X}\n"));
        Ok(())
    }

    fn emit_fixed_addr_instr(&mut self, mnemonic: &str, opcode: u8, addr: u8) -> Result<()> {
        self.image.emit_byte(opcode)?;
        self.image.emit_byte(addr)?;
        self.image.emit_byte(0)?;
        self.asm.push_str(&format!("{mnemonic} ${:04X}\n", addr as u16));
        Ok(())
    }

    fn emit_addr_instr(&mut self, mnemonic: &str, opcode: u8, placeholder: PlaceholderId) -> Result<()> {
        self.image.emit_byte(opcode)?;
        let offset = self.image.emit_placeholder_bytes()?;
        self.placeholders[placeholder].byte_offsets.push(offset);

        self.asm.push_str(mnemonic);
        self.asm.push(' ');
        let asm_off = self.asm.len();
        self.asm.push_str("_TEMP");
        self.placeholders[placeholder].asm_offsets.push(asm_off);
        self.asm.push('\n');
        Ok(())
    }

    fn emit_sys(&mut self) -> Result<()> {
        self.image.emit_byte(0xFF)?;
        self.asm.push_str("SYS\n");
        Ok(())
    }

    fn emit_brk(&mut self) -> Result<()> {
        self.image.emit_byte(0x00)?;
        self.asm.push_str("BRK\n");
        Ok(())
    }

    fn reserve_bne(&mut self) -> Result<BneFixup> {
        self.image.emit_byte(0xD0)?;
        let operand_off = self.image.emit_byte(0)?;
        self.asm.push_str("BNE ");
        let asm_off = self.asm.len();
        self.asm.push_str("_TEMP\n");
        Ok(BneFixup { operand_off, asm_off })
    }

    fn forward_distance(&self, fixup: &BneFixup) -> Result<u8> {
        self.branch_distance_to(fixup, self.image.cur_byte_ptr)
    }

    /// Like [`Self::forward_distance`], but against an explicit target
    /// byte offset rather than the current cursor — for branches whose
    /// target was passed by further emission before patching.
    fn branch_distance_to(&self, fixup: &BneFixup, target: usize) -> Result<u8> {
        let pc_after_branch = fixup.operand_off + 1;
        if target < pc_after_branch || target - pc_after_branch > 0xFF {
            return Err(GenError::Internal("branch target out of range".into()));
        }
        Ok((target - pc_after_branch) as u8)
    }

    fn patch_bne(&mut self, fixup: BneFixup, distance: u8) {
        self.image.bytes[fixup.operand_off] = distance;
        self.asm
            .replace_range(fixup.asm_off..fixup.asm_off + 5, &format!("${distance:02X}"));
    }

    /// Assigns every placeholder an address starting at the current code
    /// cursor and rewrites every reserved byte/text offset it recorded
    /// (spec.md §4.6 "Backpatching").
    fn backpatch(&mut self) -> Result<()> {
        let mut end_stack_ptr = self.image.cur_byte_ptr;
        let ids: Vec<PlaceholderId> = (0..self.placeholders.len())
            .map(PlaceholderId::from_usize)
            .collect();

        for id in ids {
            if end_stack_ptr >= self.image.top_heap_ptr {
                return Err(GenError::MemoryExceeded);
            }
            let addr = end_stack_ptr as u8;
            end_stack_ptr += 1;

            let byte_offsets = self.placeholders[id].byte_offsets.clone();
            for offset in byte_offsets {
                self.image.bytes[offset] = addr;
                self.image.bytes[offset + 1] = 0x00;
            }

            let patched = format!("${:04X}", addr as u16);
            let mut asm_offsets = self.placeholders[id].asm_offsets.clone();
            // "_TEMP" and "$HHHH" are both 5 characters, so patching in
            // any order leaves every other recorded offset valid.
            asm_offsets.sort_unstable_by(|a, b| b.cmp(a));
            for offset in asm_offsets {
                self.asm.replace_range(offset..offset + 5, &patched);
            }

            self.placeholders[id].resolved_addr = Some(addr);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gopiler_lex::lex;
    use gopiler_par::parse;
    use gopiler_sem::analyze;

    fn compile(src: &str) -> CodeGenOutcome {
        let diag = Diagnostics::terminal(false);
        let progs = lex(src, &diag);
        let parsed = parse(&progs[0].tokens, &diag, 1);
        let analyzed = gopiler_sem::analyze(parsed.cst.as_ref(), &diag, 1);
        generate(analyzed.ast.as_ref(), analyzed.symbols.as_ref(), &diag, 1)
    }

    #[test]
    fn empty_block_emits_just_brk() {
        let out = compile("{}$");
        let image = out.image.expect("code generation should succeed");
        assert_eq!(image.bytes[0], 0x00);
        assert!(image.bytes[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn var_decl_assign_print_int() {
        let out = compile("{ int a a = 3 print(a) }$");
        assert!(out.image.is_some());
        let asm = out.assembly.unwrap();
        assert!(asm.contains("LDA #$00"));
        assert!(asm.contains("LDA #$03"));
        assert!(asm.contains("SYS"));
        assert!(asm.contains("BRK"));
    }

    #[test]
    fn string_literal_heap_layout() {
        let out = compile("{ string s s = \"hi\" print(s) }$");
        let image = out.image.unwrap();
        assert_eq!(&image.bytes[252..255], &[b'h', b'i', 0]);
    }

    #[test]
    fn increment_peephole_emits_inc_not_lda_adc() {
        let out = compile("{ int a a = 1 + a a = 1 + a }$");
        let asm = out.assembly.unwrap();
        assert_eq!(asm.matches("INC").count(), 2);
        assert_eq!(asm.matches("ADC").count(), 0);
    }

    #[test]
    fn if_statement_backpatches_forward_branch() {
        let out = compile("{ if (1 == 1) { print(\"ok\") } }$");
        assert!(out.image.is_some());
        let asm = out.assembly.unwrap();
        assert!(asm.contains("BNE $"));
        assert!(!asm.contains("_TEMP"));
    }

    #[test]
    fn while_statement_backpatches_backward_branch() {
        let out = compile("{ int a while (a == 0) { a = 1 + a } }$");
        assert!(out.image.is_some());
    }

    #[test]
    fn memory_overflow_is_reported_as_error() {
        let mut src = String::from("{ ");
        for c in 'a'..='z' {
            src.push_str(&format!("string {c} {c} = \"a very very long string literal here\" "));
        }
        src.push_str("}$");
        let out = compile(&src);
        assert!(out.image.is_none());
        assert!(out.counters.has_errors());
    }

    #[test]
    fn addition_chain_collapses_digits_and_ids() {
        let out = compile("{ int a a = 3 int b b = 2 + a print(b) }$");
        let asm = out.assembly.unwrap();
        assert!(asm.contains("ADC"));
    }
}
