use crate::mqtt::payload::StatusPayload;

use super::rest::light::{ColorMode, LightState};

pub const MAX_BRI: f64 = 254.0;
pub const MAX_SAT: f64 = 254.0;
pub const MAX_HUE: f64 = 65535.0;

/// What a single poll result says about one light.
#[derive(Clone, Debug, PartialEq)]
pub struct LightReport {
    pub online: bool,
    pub status: Option<StatusPayload>,
}

pub fn light_report(state: &LightState) -> LightReport {
    if !state.reachable {
        return LightReport {
            online: false,
            status: None,
        };
    }

    LightReport {
        online: true,
        status: light_status(state),
    }
}

fn light_status(state: &LightState) -> Option<StatusPayload> {
    let Some(bri) = state.bri else {
        // Not dimmable, behaves like a switch
        return Some(StatusPayload::Switch { val: state.on });
    };

    let val = if state.on { f64::from(bri) / MAX_BRI } else { 0.0 };

    match state.colormode? {
        ColorMode::Hs => Some(StatusPayload::HueSaturation {
            val,
            hue: state.hue.map(|hue| f64::from(hue) / MAX_HUE),
            sat: state.sat.map(|sat| f64::from(sat) / MAX_SAT),
        }),
        ColorMode::Ct => Some(StatusPayload::ColorTemperature { val, ct: state.ct }),
        // xy needs a colour space conversion we don't do
        ColorMode::Xy | ColorMode::Unknown => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reachable(state: LightState) -> LightState {
        LightState {
            reachable: true,
            ..state
        }
    }

    #[test]
    fn test_unreachable_light_has_no_status() {
        let report = light_report(&LightState {
            on: true,
            bri: Some(254),
            colormode: Some(ColorMode::Ct),
            ct: Some(300),
            reachable: false,
            ..Default::default()
        });

        assert_eq!(
            report,
            LightReport {
                online: false,
                status: None
            }
        );
    }

    #[test]
    fn test_hue_saturation_light() {
        let report = light_report(&reachable(LightState {
            on: true,
            bri: Some(127),
            hue: Some(65535),
            sat: Some(254),
            colormode: Some(ColorMode::Hs),
            ..Default::default()
        }));

        assert!(report.online);
        assert_eq!(
            report.status,
            Some(StatusPayload::HueSaturation {
                val: 0.5,
                hue: Some(1.0),
                sat: Some(1.0)
            })
        );
    }

    #[test]
    fn test_missing_colour_values_are_left_out() {
        let report = light_report(&reachable(LightState {
            on: true,
            bri: Some(254),
            colormode: Some(ColorMode::Ct),
            ..Default::default()
        }));

        assert_eq!(
            report.status,
            Some(StatusPayload::ColorTemperature { val: 1.0, ct: None })
        );
        assert_eq!(
            serde_json::to_value(report.status).unwrap(),
            serde_json::json!({"val": 1.0})
        );

        let hs = light_report(&reachable(LightState {
            on: true,
            bri: Some(254),
            sat: Some(127),
            colormode: Some(ColorMode::Hs),
            ..Default::default()
        }));

        assert_eq!(
            serde_json::to_value(hs.status).unwrap(),
            serde_json::json!({"val": 1.0, "sat": 127.0 / 254.0})
        );
    }

    #[test]
    fn test_light_that_is_off_reports_zero_val() {
        let report = light_report(&reachable(LightState {
            on: false,
            bri: Some(200),
            ct: Some(366),
            colormode: Some(ColorMode::Ct),
            ..Default::default()
        }));

        assert_eq!(
            report.status,
            Some(StatusPayload::ColorTemperature {
                val: 0.0,
                ct: Some(366)
            })
        );
    }

    #[test]
    fn test_xy_and_missing_colormode_are_unreported() {
        let xy = light_report(&reachable(LightState {
            on: true,
            bri: Some(100),
            colormode: Some(ColorMode::Xy),
            ..Default::default()
        }));
        let dimmable_only = light_report(&reachable(LightState {
            on: true,
            bri: Some(100),
            ..Default::default()
        }));

        assert!(xy.online);
        assert_eq!(xy.status, None);
        assert!(dimmable_only.online);
        assert_eq!(dimmable_only.status, None);
    }

    #[test]
    fn test_switch_without_brightness() {
        let report = light_report(&reachable(LightState {
            on: true,
            ..Default::default()
        }));

        assert_eq!(report.status, Some(StatusPayload::Switch { val: true }));
    }
}
