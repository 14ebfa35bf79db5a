//! Measurand to datum property mapping

use crate::domain::{DatumClassification, Measurand, Phase};

/// Measurand lookup table: classification and base property name.
///
/// Register-type energy, reactive energy and reactive power accumulate;
/// everything else is a point-in-time sample.
pub const MEASURAND_PROPERTIES: &[(Measurand, DatumClassification, &str)] = &[
    (
        Measurand::CurrentExport,
        DatumClassification::Instantaneous,
        "current_export",
    ),
    (
        Measurand::CurrentImport,
        DatumClassification::Instantaneous,
        "current",
    ),
    (
        Measurand::CurrentOffered,
        DatumClassification::Instantaneous,
        "current_offered",
    ),
    (
        Measurand::EnergyActiveExportRegister,
        DatumClassification::Accumulating,
        "wattHours_export",
    ),
    (
        Measurand::EnergyActiveImportRegister,
        DatumClassification::Accumulating,
        "wattHours",
    ),
    (
        Measurand::EnergyReactiveExportRegister,
        DatumClassification::Accumulating,
        "varHours_export",
    ),
    (
        Measurand::EnergyReactiveImportRegister,
        DatumClassification::Accumulating,
        "varHours",
    ),
    (
        Measurand::EnergyActiveExportInterval,
        DatumClassification::Instantaneous,
        "wattHours_export_interval",
    ),
    (
        Measurand::EnergyActiveImportInterval,
        DatumClassification::Instantaneous,
        "wattHours_interval",
    ),
    (
        Measurand::EnergyReactiveExportInterval,
        DatumClassification::Instantaneous,
        "varHours_export_interval",
    ),
    (
        Measurand::EnergyReactiveImportInterval,
        DatumClassification::Instantaneous,
        "varHours_interval",
    ),
    (
        Measurand::Frequency,
        DatumClassification::Instantaneous,
        "frequency",
    ),
    (
        Measurand::PowerActiveExport,
        DatumClassification::Instantaneous,
        "watts_export",
    ),
    (
        Measurand::PowerActiveImport,
        DatumClassification::Instantaneous,
        "watts",
    ),
    (
        Measurand::PowerFactor,
        DatumClassification::Instantaneous,
        "powerFactor",
    ),
    (
        Measurand::PowerOffered,
        DatumClassification::Instantaneous,
        "watts_offered",
    ),
    (
        Measurand::PowerReactiveExport,
        DatumClassification::Accumulating,
        "var_export",
    ),
    (
        Measurand::PowerReactiveImport,
        DatumClassification::Accumulating,
        "var",
    ),
    (Measurand::RPM, DatumClassification::Instantaneous, "rpm"),
    (Measurand::SoC, DatumClassification::Instantaneous, "soc"),
    (
        Measurand::Temperature,
        DatumClassification::Instantaneous,
        "temp",
    ),
    (
        Measurand::Voltage,
        DatumClassification::Instantaneous,
        "voltage",
    ),
];

/// Classification and base property name for a measurand.
pub fn measurand_property(measurand: Measurand) -> Option<(DatumClassification, &'static str)> {
    MEASURAND_PROPERTIES
        .iter()
        .find(|(m, _, _)| *m == measurand)
        .map(|(_, classification, name)| (*classification, *name))
}

/// Property name suffix for a sampled phase.
pub fn phase_suffix(phase: Phase) -> &'static str {
    match phase {
        Phase::N => "_n",
        Phase::L1 | Phase::L1N => "_a",
        Phase::L2 | Phase::L2N => "_b",
        Phase::L3 | Phase::L3N => "_c",
        Phase::L1L2 => "_ab",
        Phase::L2L3 => "_bc",
        Phase::L3L1 => "_ca",
    }
}

/// Full datum property name for a measurand, with the phase suffix when a
/// phase was sampled.
pub fn property_name(measurand: Measurand, phase: Option<Phase>) -> Option<String> {
    let (_, base) = measurand_property(measurand)?;
    Some(match phase {
        Some(phase) => format!("{}{}", base, phase_suffix(phase)),
        None => base.to_string(),
    })
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_MEASURANDS: &[Measurand] = &[
        Measurand::CurrentExport,
        Measurand::CurrentImport,
        Measurand::CurrentOffered,
        Measurand::EnergyActiveExportRegister,
        Measurand::EnergyActiveImportRegister,
        Measurand::EnergyReactiveExportRegister,
        Measurand::EnergyReactiveImportRegister,
        Measurand::EnergyActiveExportInterval,
        Measurand::EnergyActiveImportInterval,
        Measurand::EnergyReactiveExportInterval,
        Measurand::EnergyReactiveImportInterval,
        Measurand::Frequency,
        Measurand::PowerActiveExport,
        Measurand::PowerActiveImport,
        Measurand::PowerFactor,
        Measurand::PowerOffered,
        Measurand::PowerReactiveExport,
        Measurand::PowerReactiveImport,
        Measurand::RPM,
        Measurand::SoC,
        Measurand::Temperature,
        Measurand::Voltage,
    ];

    #[test]
    fn every_measurand_is_mapped() {
        for &measurand in ALL_MEASURANDS {
            assert!(
                measurand_property(measurand).is_some(),
                "unmapped measurand {:?}",
                measurand
            );
        }
        assert_eq!(MEASURAND_PROPERTIES.len(), ALL_MEASURANDS.len());
    }

    #[test]
    fn register_energy_and_reactive_power_accumulate() {
        for measurand in [
            Measurand::EnergyActiveExportRegister,
            Measurand::EnergyActiveImportRegister,
            Measurand::EnergyReactiveExportRegister,
            Measurand::EnergyReactiveImportRegister,
            Measurand::PowerReactiveExport,
            Measurand::PowerReactiveImport,
        ] {
            let (classification, _) = measurand_property(measurand).unwrap();
            assert_eq!(classification, DatumClassification::Accumulating);
        }
        let (classification, _) = measurand_property(Measurand::PowerActiveImport).unwrap();
        assert_eq!(classification, DatumClassification::Instantaneous);
    }

    #[test]
    fn phase_suffixes() {
        assert_eq!(property_name(Measurand::CurrentImport, Some(Phase::N)).unwrap(), "current_n");
        assert_eq!(property_name(Measurand::CurrentImport, Some(Phase::L1)).unwrap(), "current_a");
        assert_eq!(property_name(Measurand::Voltage, Some(Phase::L2N)).unwrap(), "voltage_b");
        assert_eq!(property_name(Measurand::Voltage, Some(Phase::L3)).unwrap(), "voltage_c");
        assert_eq!(property_name(Measurand::Voltage, Some(Phase::L1L2)).unwrap(), "voltage_ab");
        assert_eq!(property_name(Measurand::Voltage, Some(Phase::L2L3)).unwrap(), "voltage_bc");
        assert_eq!(property_name(Measurand::Voltage, Some(Phase::L3L1)).unwrap(), "voltage_ca");
        assert_eq!(property_name(Measurand::Voltage, None).unwrap(), "voltage");
    }
}
