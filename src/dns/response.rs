// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reply construction and UDP truncation.

use hickory_proto::error::ProtoError;
use hickory_proto::op::{Message, MessageType, ResponseCode};
use hickory_proto::rr::Record;

/// Empty reply to `req`: same id, opcode, RD flag and question.
#[must_use]
pub fn reply(req: &Message) -> Message {
    let mut msg = Message::new();
    msg.set_id(req.id())
        .set_message_type(MessageType::Response)
        .set_op_code(req.op_code())
        .set_recursion_desired(req.recursion_desired())
        .add_queries(req.queries().to_vec());
    msg
}

/// Reply with `code` and no records.
#[must_use]
pub fn error(req: &Message, code: ResponseCode) -> Message {
    let mut msg = reply(req);
    msg.set_response_code(code);
    msg
}

#[must_use]
pub fn refused(req: &Message) -> Message {
    error(req, ResponseCode::Refused)
}

#[must_use]
pub fn servfail(req: &Message) -> Message {
    error(req, ResponseCode::ServFail)
}

/// Short upper-case mnemonic of a response code.
#[must_use]
pub fn rcode_name(code: ResponseCode) -> String {
    match code {
        ResponseCode::NoError => "NOERROR".into(),
        ResponseCode::FormErr => "FORMERR".into(),
        ResponseCode::ServFail => "SERVFAIL".into(),
        ResponseCode::NXDomain => "NXDOMAIN".into(),
        ResponseCode::NotImp => "NOTIMP".into(),
        ResponseCode::Refused => "REFUSED".into(),
        ResponseCode::NotAuth => "NOTAUTH".into(),
        ResponseCode::NotZone => "NOTZONE".into(),
        other => format!("RCODE{}", u16::from(other)),
    }
}

/// Shrink `msg` until its encoding fits in `max` bytes.
///
/// Whole records are removed from the end of the additional section, then the
/// authority section, then the answer section. TC is set as soon as any record is
/// dropped.
///
/// # Errors
///
/// Returns the encoder error if the message cannot be serialized.
pub fn truncate(msg: &mut Message, max: usize) -> Result<(), ProtoError> {
    if msg.to_vec()?.len() <= max {
        return Ok(());
    }

    let mut answers = msg.take_answers();
    let mut authority = msg.take_name_servers();
    let mut additional = msg.take_additionals();

    loop {
        let dropped = additional.pop().is_some() || authority.pop().is_some() || answers.pop().is_some();
        set_sections(msg, &answers, &authority, &additional);
        if !dropped {
            break;
        }
        msg.set_truncated(true);
        if msg.to_vec()?.len() <= max {
            break;
        }
    }
    Ok(())
}

/// Replace the three record sections of `msg`.
fn set_sections(msg: &mut Message, answers: &[Record], authority: &[Record], additional: &[Record]) {
    msg.take_answers();
    msg.take_name_servers();
    msg.take_additionals();
    msg.insert_answers(answers.to_vec());
    msg.insert_name_servers(authority.to_vec());
    msg.insert_additionals(additional.to_vec());
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod response_tests;
