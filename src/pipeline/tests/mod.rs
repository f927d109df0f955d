//! Pipeline tests over small raw snapshots
//!
//! Fixtures mirror the column layout of the real registries with a handful
//! of rows each, including rows that must be dropped.

use crate::config::PrepConfig;
use crate::models::Source;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;


pub const POSTAL_CSV: &str = "Code_commune_INSEE;Nom_commune;Code_postal;Libellé_d_acheminement;coordonnees_gps\n\
75114;PARIS 14;75014;PARIS;48.83,2.33\n\
69123;LYON;69001;LYON;45.76,4.84\n\
98711;ILE CLIPPERTON;98799;ILE CLIPPERTON;\n";

pub const STATIONS_CSV: &str = "CODE_UIC;LIBELLE;FRET;VOYAGEURS;C_GEO;X_WGS84;Y_WGS84\n\
1234561;Gare A;N;O;48.1,2.1;2.1;48.1\n\
1234562;Gare B;N;O;48.2,2.2;2.2;48.2\n\
87391003;Paris-Montparnasse;N;O;48.8412,2.3205;2.3205;48.8412\n\
87000000;Sans position;N;O;;;\n";

pub const TVS_CSV: &str = "TVS;Intitulé gare;Code UIC;WGS 84\n\
ECO;Écommoy;87396309;47.8266,0.2733\n\
QPL;Quimperlé;87476606;47.8722,-3.5477\n\
;Halte sans code;87000001;47.0,0.1\n";

pub const AIRPORTS_CSV: &str = "id,ident,type,name,latitude_deg,longitude_deg,iso_country,iata_code\n\
1,LFPG,large_airport,\"Charles de Gaulle International Airport\",49.0128,2.55,FR,CDG\n\
2,LFPO,large_airport,\"Paris-Orly Airport\",48.7233,2.3794,FR,ORY\n\
3,LFXX,small_airport,\"No Latitude Field\",,2.0,FR,NLF\n\
4,00AA,small_airport,\"Aero B Ranch Airport\",38.704,-101.473,US,\n";

/// Raw and prepared directories of one test batch
pub struct Workspace {
    pub temp_dir: TempDir,
    pub raw_dir: PathBuf,
    pub prepared_dir: PathBuf,
}

impl Workspace {
    pub fn config(&self) -> PrepConfig {
        PrepConfig::default()
            .with_raw_dir(&self.raw_dir)
            .with_prepared_dir(&self.prepared_dir)
            .with_workers(2)
            .without_progress()
    }
}

/// Create a workspace with all four raw snapshots present
pub fn create_workspace() -> Workspace {
    let temp_dir = TempDir::new().unwrap();
    let raw_dir = temp_dir.path().join("raw");
    let prepared_dir = temp_dir.path().join("prepared");
    fs::create_dir_all(&raw_dir).unwrap();

    write_raw(&raw_dir, Source::Insee, POSTAL_CSV);
    write_raw(&raw_dir, Source::Uic, STATIONS_CSV);
    write_raw(&raw_dir, Source::Tvs, TVS_CSV);
    write_raw(&raw_dir, Source::Iata, AIRPORTS_CSV);

    Workspace {
        temp_dir,
        raw_dir,
        prepared_dir,
    }
}

pub fn write_raw(raw_dir: &Path, source: Source, contents: &str) {
    fs::write(raw_dir.join(source.raw_file_name()), contents).unwrap();
}
