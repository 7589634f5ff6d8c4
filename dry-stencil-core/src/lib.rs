// MIT License
//
// Copyright (c) 2024 Jerome Johnson
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Streaming token substitution
//!
//! `dry-stencil-core` scans a byte stream for configured tokens and rewrites the
//! stream as it goes: conditional blocks are kept or dropped, variables are
//! expanded, literal replacements are applied and regions are cut out. Input is
//! never loaded whole; a bounded buffer slides over the source and every
//! operation works against that window.
//!
//! Most users want the [`dry-stencil`](https://docs.rs/dry-stencil) facade. This
//! crate exposes the building blocks: the tries, the processor state and its
//! seek primitives, and the two expression evaluators.

pub mod convert;
pub mod encoding;
pub mod error;
pub mod expressions;
pub mod operations;
pub mod processor;
pub mod trie;
pub mod value;
pub mod variables;

pub use convert::{Converter, TypeTag};
pub use encoding::Encoding;
pub use error::{ConfigError, Error, ExpressionEvaluationError, Result};
pub use expressions::{EvaluatorKind, evaluate_condition};
pub use operations::{Operation, OperationProvider};
pub use processor::{EngineConfig, Processor, ProcessorOptions, state::TargetStream};
pub use value::Value;
pub use variables::VariableCollection;
