//! AST-to-Circuit lowering for QASM3.

use devgw_ir::{
    Circuit, ClbitId, CustomGate, Instruction, ParameterExpression, QubitId, StandardGate,
};
use rustc_hash::FxHashMap;

use crate::ast::{BinOp, BitRef, Expression, GateCall, Program, QubitRef, Statement};
use crate::error::{ParseError, ParseResult};

/// Lower an AST Program to a Circuit.
pub(crate) fn lower_to_circuit(program: &Program) -> ParseResult<Circuit> {
    let mut lowerer = Lowerer::new();
    lowerer.lower(program)
}

/// How the program names its qubits.
enum Addressing {
    /// `qubit[n] q;` declarations.
    Registers,
    /// `$n` hardware references; the circuit spans `$0..=$max`.
    Physical { max: u32 },
    /// No qubit is referenced at all.
    None,
}

struct Lowerer {
    /// Qubit registers: name -> (`start_id`, size).
    qregs: FxHashMap<String, (u32, u32)>,
    /// Classical bit registers: name -> (`start_id`, size).
    cregs: FxHashMap<String, (u32, u32)>,
    next_qubit: u32,
    next_clbit: u32,
}

impl Lowerer {
    fn new() -> Self {
        Self {
            qregs: FxHashMap::default(),
            cregs: FxHashMap::default(),
            next_qubit: 0,
            next_clbit: 0,
        }
    }

    fn lower(&mut self, program: &Program) -> ParseResult<Circuit> {
        for stmt in &program.statements {
            match stmt {
                Statement::QubitDecl { name, size } => {
                    let size = size.unwrap_or(1);
                    self.declare_qreg(name, size)?;
                }
                Statement::BitDecl { name, size } => {
                    let size = size.unwrap_or(1);
                    self.declare_creg(name, size)?;
                }
                _ => {}
            }
        }

        let num_qubits = match self.addressing(program)? {
            Addressing::Registers => self.next_qubit,
            Addressing::Physical { max } => max + 1,
            Addressing::None => 0,
        };
        let mut circuit = Circuit::with_size("program", num_qubits, self.next_clbit);

        for stmt in &program.statements {
            self.lower_statement(&mut circuit, stmt)?;
        }

        Ok(circuit)
    }

    fn declare_qreg(&mut self, name: &str, size: u32) -> ParseResult<()> {
        if self.qregs.contains_key(name) || self.cregs.contains_key(name) {
            return Err(ParseError::DuplicateDeclaration(name.to_string()));
        }
        self.qregs.insert(name.to_string(), (self.next_qubit, size));
        self.next_qubit += size;
        Ok(())
    }

    fn declare_creg(&mut self, name: &str, size: u32) -> ParseResult<()> {
        if self.qregs.contains_key(name) || self.cregs.contains_key(name) {
            return Err(ParseError::DuplicateDeclaration(name.to_string()));
        }
        self.cregs.insert(name.to_string(), (self.next_clbit, size));
        self.next_clbit += size;
        Ok(())
    }

    fn addressing(&self, program: &Program) -> ParseResult<Addressing> {
        let max_physical = program
            .statements
            .iter()
            .flat_map(Statement::qubit_refs)
            .filter_map(|r| match r {
                QubitRef::Physical(n) => Some(*n),
                QubitRef::Single { .. } => None,
            })
            .max();

        match (max_physical, self.qregs.is_empty()) {
            (Some(n), false) => Err(ParseError::MixedQubitAddressing(n)),
            (Some(max), true) => Ok(Addressing::Physical { max }),
            (None, false) => Ok(Addressing::Registers),
            (None, true) => Ok(Addressing::None),
        }
    }

    fn lower_statement(&self, circuit: &mut Circuit, stmt: &Statement) -> ParseResult<()> {
        match stmt {
            Statement::QubitDecl { .. } | Statement::BitDecl { .. } | Statement::Include(_) => {
                Ok(())
            }

            Statement::Gate(call) => self.lower_gate_call(circuit, call),

            Statement::Measure { qubits, bits } => {
                let q_ids = self.resolve_qubits(qubits)?;
                let c_ids = self.resolve_clbits(bits)?;

                // A bare `measure q;` writes qubit n into bit n.
                let c_ids = if bits.is_empty() {
                    q_ids.iter().map(|q| ClbitId(q.0)).collect()
                } else {
                    c_ids
                };

                if q_ids.len() != c_ids.len() {
                    return Err(ParseError::MeasureMismatch {
                        qubits: q_ids.len(),
                        bits: c_ids.len(),
                    });
                }

                for (q, c) in q_ids.into_iter().zip(c_ids) {
                    circuit.measure(q, c)?;
                }
                Ok(())
            }

            Statement::Reset { qubits } => {
                for q in self.resolve_qubits(qubits)? {
                    circuit.reset(q)?;
                }
                Ok(())
            }

            Statement::Barrier { qubits } => {
                let q_ids = self.resolve_qubits(qubits)?;
                if q_ids.is_empty() {
                    circuit.barrier_all()?;
                } else {
                    circuit.barrier(q_ids)?;
                }
                Ok(())
            }

            Statement::Delay { duration, qubits } => {
                let q_ids = self.resolve_qubits(qubits)?;
                circuit.apply(Instruction::delay(q_ids, *duration))?;
                Ok(())
            }
        }
    }

    fn lower_gate_call(&self, circuit: &mut Circuit, call: &GateCall) -> ParseResult<()> {
        let qubits = self.resolve_qubits(&call.qubits)?;
        let params: Vec<_> = call
            .params
            .iter()
            .map(expr_to_param)
            .collect::<ParseResult<_>>()?;
        let name = call.name.to_lowercase();

        match name.as_str() {
            "x" => {
                check_param_count("x", &params, 0)?;
                for q in qubits {
                    circuit.x(q)?;
                }
                Ok(())
            }
            "sx" => {
                check_param_count("sx", &params, 0)?;
                for q in qubits {
                    circuit.sx(q)?;
                }
                Ok(())
            }
            "rz" => {
                check_param_count("rz", &params, 1)?;
                for q in qubits {
                    circuit.rz(params[0].clone(), q)?;
                }
                Ok(())
            }
            "rx" => {
                check_param_count("rx", &params, 1)?;
                for q in qubits {
                    circuit.rx(params[0].clone(), q)?;
                }
                Ok(())
            }
            "cx" | "cnot" => {
                check_param_count("cx", &params, 0)?;
                check_qubit_count("cx", &qubits, 2)?;
                circuit.apply(Instruction::gate(StandardGate::CX, qubits))?;
                Ok(())
            }
            // Kept opaque; backends decide whether they can run it.
            _ => {
                let arity = u32::try_from(qubits.len())
                    .map_err(|_| ParseError::Generic(format!("too many operands for {name}")))?;
                circuit.gate(CustomGate::new(name, arity).with_params(params), qubits)?;
                Ok(())
            }
        }
    }

    fn resolve_qubits(&self, refs: &[QubitRef]) -> ParseResult<Vec<QubitId>> {
        let mut ids = Vec::new();
        for r in refs {
            match r {
                QubitRef::Physical(n) => ids.push(QubitId(*n)),
                QubitRef::Single { register, index } => {
                    let (start, size) = self
                        .qregs
                        .get(register)
                        .ok_or_else(|| ParseError::UndefinedIdentifier(register.clone()))?;

                    match index {
                        Some(idx) if idx >= size => {
                            return Err(ParseError::IndexOutOfBounds {
                                register: register.clone(),
                                index: *idx as usize,
                                size: *size as usize,
                            });
                        }
                        Some(idx) => ids.push(QubitId(start + idx)),
                        None => ids.extend((0..*size).map(|i| QubitId(start + i))),
                    }
                }
            }
        }
        Ok(ids)
    }

    fn resolve_clbits(&self, refs: &[BitRef]) -> ParseResult<Vec<ClbitId>> {
        let mut ids = Vec::new();
        for BitRef::Single { register, index } in refs {
            let (start, size) = self
                .cregs
                .get(register)
                .ok_or_else(|| ParseError::UndefinedIdentifier(register.clone()))?;

            match index {
                Some(idx) if idx >= size => {
                    return Err(ParseError::IndexOutOfBounds {
                        register: register.clone(),
                        index: *idx as usize,
                        size: *size as usize,
                    });
                }
                Some(idx) => ids.push(ClbitId(start + idx)),
                None => ids.extend((0..*size).map(|i| ClbitId(start + i))),
            }
        }
        Ok(ids)
    }
}

/// Convert AST expression to `ParameterExpression`.
#[allow(clippy::cast_precision_loss)]
fn expr_to_param(expr: &Expression) -> ParseResult<ParameterExpression> {
    Ok(match expr {
        Expression::Int(v) => ParameterExpression::Constant(*v as f64),
        Expression::Float(v) => ParameterExpression::Constant(*v),
        Expression::Pi => ParameterExpression::Pi,
        Expression::Tau => ParameterExpression::Constant(std::f64::consts::TAU),
        Expression::Euler => ParameterExpression::Constant(std::f64::consts::E),
        Expression::Identifier(name) => {
            return Err(ParseError::UndefinedIdentifier(name.clone()));
        }
        Expression::Neg(e) => ParameterExpression::Neg(Box::new(expr_to_param(e)?)),
        Expression::BinOp { left, op, right } => {
            let l = Box::new(expr_to_param(left)?);
            let r = Box::new(expr_to_param(right)?);
            match op {
                BinOp::Add => ParameterExpression::Add(l, r),
                BinOp::Sub => ParameterExpression::Sub(l, r),
                BinOp::Mul => ParameterExpression::Mul(l, r),
                BinOp::Div => ParameterExpression::Div(l, r),
                BinOp::Pow | BinOp::Mod => {
                    let value = expr.as_f64().ok_or_else(|| {
                        ParseError::Generic(format!("Cannot evaluate {op:?} in parameter"))
                    })?;
                    ParameterExpression::Constant(value)
                }
                _ => {
                    return Err(ParseError::Generic(format!(
                        "Unsupported operator in parameter: {op:?}"
                    )));
                }
            }
        }
        Expression::Paren(e) => expr_to_param(e)?,
        Expression::FnCall { name, .. } => match expr.as_f64() {
            Some(v) => ParameterExpression::Constant(v),
            None => return Err(ParseError::Generic(format!("Cannot evaluate function {name}"))),
        },
        Expression::Bool(_) => {
            return Err(ParseError::Generic(
                "Boolean value used as gate parameter".into(),
            ));
        }
    })
}

fn check_param_count(
    gate: &str,
    params: &[ParameterExpression],
    expected: usize,
) -> ParseResult<()> {
    if params.len() == expected {
        Ok(())
    } else {
        Err(ParseError::WrongParameterCount {
            gate: gate.into(),
            expected,
            got: params.len(),
        })
    }
}

fn check_qubit_count(gate: &str, qubits: &[QubitId], expected: usize) -> ParseResult<()> {
    if qubits.len() == expected {
        Ok(())
    } else {
        Err(ParseError::WrongQubitCount {
            gate: gate.into(),
            expected,
            got: qubits.len(),
        })
    }
}
