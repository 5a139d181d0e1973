//! Sample configuration shared by integration tests

use std::sync::Arc;
use varinfo::RuleSet;

pub const SAMPLE_CONFIG_YAML: &str = r#"
Identification: varinfo_sample_config
Version: 1
CollectionShortNamePath:
  - /HDF5_GLOBAL/short_name
  - /METADATA/DatasetIdentification/shortName
  - short_name
Mission:
  ATL\d{2}: ICESat2
  GEDI_L[1234][AB]|GEDI0[1-4]_[AB]: GEDI
  GPM_3IMERG.*: GPM
ExcludedScienceVariables:
  - Applicability: { Mission: ICESat2 }
    VariablePattern:
      - /quality_assessment/.*
RequiredVariables:
  - Applicability: { Mission: GEDI }
    VariablePattern:
      - .*shot_number
MetadataOverrides:
  - Applicability: { Mission: ICESat2, ShortNamePath: ATL03, VariablePattern: "/gt[123][lr]/heights/.*" }
    Attributes:
      - Name: coordinates
        Value: ../geolocation/reference_photon_lat ../geolocation/reference_photon_lon
  - Applicability: { Mission: ICESat2, ShortNamePath: ATL03, VariablePattern: "/gt[123][lr]/heights/h_ph" }
    Attributes:
      - { Name: long_name, Value: photon WGS84 height }
  - Applicability: { Mission: ICESat2 }
    Attributes:
      - { Name: source_mission, Value: ICESat-2 }
"#;

pub fn sample_rules() -> Arc<RuleSet> {
    Arc::new(RuleSet::from_yaml_str(SAMPLE_CONFIG_YAML).expect("sample configuration loads"))
}
