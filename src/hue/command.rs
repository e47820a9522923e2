use crate::mqtt::payload::{ControlFields, ControlNumber, ControlPayload, ControlValue};

use super::{
    rest::light::LightCommand,
    status::{MAX_BRI, MAX_HUE, MAX_SAT},
};

/// Translates a control message into a bridge state patch.
///
/// Float to integer casts truncate toward zero and saturate at the target
/// type's bounds, which is what the bridge's integer API expects.
pub fn light_command(payload: &ControlPayload) -> LightCommand {
    let mut command = LightCommand::default();

    match payload {
        ControlPayload::Power(on) => command.on = Some(*on),
        ControlPayload::Level(level) => apply_level(&mut command, *level),
        ControlPayload::Fields(fields) => apply_fields(&mut command, fields),
        ControlPayload::List(_) | ControlPayload::Unrecognized(_) => {}
    }

    command
}

/// Fields that aren't numbers are skipped one by one.
fn apply_fields(command: &mut LightCommand, fields: &ControlFields) {
    let number = |field: &Option<ControlNumber>| field.as_ref().and_then(ControlNumber::number);

    if let Some(ms) = number(&fields.transitiontime) {
        command.transitiontime = Some((ms / 100.0) as u16);
    }

    // Changing colour turns the light on
    if let Some(hue) = number(&fields.hue) {
        command.on = Some(true);
        command.hue = Some((hue * MAX_HUE) as u16);
    }

    if let Some(sat) = number(&fields.sat) {
        command.on = Some(true);
        command.sat = Some((sat * MAX_SAT) as u8);
    }

    if let Some(ct) = number(&fields.ct) {
        command.on = Some(true);
        command.ct = Some(ct as u16);
    }

    match &fields.val {
        Some(ControlValue::Level(level)) => apply_level(command, *level),
        Some(ControlValue::Power(on)) => command.on = Some(*on),
        Some(ControlValue::Unrecognized(_)) | None => {}
    }
}

/// Brightness 0 (or below) means "off", never write `bri: 0`. Levels above 1
/// are clamped to full brightness.
fn apply_level(command: &mut LightCommand, level: f64) {
    if level > 0.0 {
        command.on = Some(true);
        command.bri = Some((level.min(1.0) * MAX_BRI) as u8);
    } else {
        command.on = Some(false);
    }
}
