//! Buffer-based string return
//!
//! Native APIs that return text usually take a caller buffer and its
//! capacity as their last two parameters and report the number of
//! characters written. These adapters supply both, so callers pass only the
//! leading arguments.
//!
//! Without an explicit capacity the registry's configured buffer capacity is
//! used. Without an explicit encoding the text is decoded as wide when the
//! bound export ends in `W` and as ANSI otherwise.

use crate::binding::{ArityGuard, Block, Procedure};
use crate::error::BindResult;
use crate::ffi::buffer::{CountSlot, TextBuffer};
use crate::binding::BindingDescriptor;
use crate::ffi::caller::RawFunction;
use crate::ffi::types::TextEncoding;
use crate::value::Value;
use std::sync::Arc;

/// Number of arguments the string adapters append
const SYNTHESIZED: usize = 2;

/// Buffer for one call
fn buffer_for(
    d: &BindingDescriptor,
    capacity: Option<usize>,
    encoding: Option<TextEncoding>,
) -> TextBuffer {
    TextBuffer::new(
        capacity.unwrap_or(d.buffer_capacity()),
        encoding.unwrap_or(d.encoding()),
    )
}

/// Fixed-capacity string return
///
/// Appends a buffer of `capacity` characters and the capacity itself. A
/// result count of zero (or less) yields `Value::Null`; otherwise the first
/// `count` characters are decoded and trailing whitespace and NULs are
/// trimmed. A block, if given, receives the text.
///
/// ```
/// # use apibind_runtime::adapters::string_return;
/// # use apibind_runtime::ffi::TextEncoding;
/// // Configured capacity, encoding from the bound export name
/// let by_name = string_return(None, None);
/// // 256 characters, always decoded as UTF-16
/// let wide = string_return(Some(256), Some(TextEncoding::Wide));
/// # let _ = (by_name, wide);
/// ```
pub fn string_return(capacity: Option<usize>, encoding: Option<TextEncoding>) -> Procedure {
    Arc::new(
        move |raw: &RawFunction, args: &[Value], block: Option<&Block<'_>>| -> BindResult<Value> {
            let d = raw.descriptor();
            ArityGuard::check(d.name(), d.params().len(), SYNTHESIZED, args.len())?;

            let mut buffer = buffer_for(d, capacity, encoding);
            let capacity = buffer.capacity();
            let mut call_args = args.to_vec();
            call_args.push(buffer.as_value());
            call_args.push(Value::Int(capacity as i64));

            let text = match raw.call(&call_args)?.as_int() {
                Some(count) if count > 0 => Value::string(buffer.read(count as usize)),
                _ => Value::Null,
            };
            Ok(finish(text, block))
        },
    )
}

/// String return with an in/out length slot
///
/// Appends a buffer and the address of a 32-bit slot holding the capacity.
/// A zero native result yields `Value::Null`; otherwise the length written
/// back into the slot selects the text (zero written length also yields
/// `Value::Null`). Capacity and encoding default as for `string_return`.
pub fn sized_string_return(capacity: Option<usize>, encoding: Option<TextEncoding>) -> Procedure {
    Arc::new(
        move |raw: &RawFunction, args: &[Value], block: Option<&Block<'_>>| -> BindResult<Value> {
            let d = raw.descriptor();
            ArityGuard::check(d.name(), d.params().len(), SYNTHESIZED, args.len())?;

            let mut buffer = buffer_for(d, capacity, encoding);
            let slot = CountSlot::new(u32::try_from(buffer.capacity()).unwrap_or(u32::MAX));
            let mut call_args = args.to_vec();
            call_args.push(buffer.as_value());
            call_args.push(slot.as_value());

            let status = raw.call(&call_args)?;
            let text = if status.is_truthy() && slot.get() > 0 {
                Value::string(buffer.read(slot.get() as usize))
            } else {
                Value::Null
            };
            Ok(finish(text, block))
        },
    )
}

fn finish(text: Value, block: Option<&Block<'_>>) -> Value {
    match block {
        Some(block) => block(&text),
        None => text,
    }
}
