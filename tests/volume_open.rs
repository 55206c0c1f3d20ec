// tests/volume_open.rs
//
// Run only this file:
//   cargo test --test volume_open -- --nocapture
//
// Covers:
// 1) lifecycle: double open, close without open, double close → State
// 2) store enumeration: catalog order, index range checks, lookup by identifier
// 3) store properties from the catalog and the store header, StoreInfo agreement
// 4) in-progress stores, volumes without a catalog, chained catalogs
// 5) opening by path (tempfile), write mode rejected, missing path → Io
// 6) a volume embedded at an offset of a larger image (BoundedReader)

mod common;

use std::io::{Cursor, Write};

use anyhow::Result;

use common::{guid, init_logging, ImageBuilder, StoreSpec, BS};
use vshadow::{AccessMode, BoundedReader, ErrorKind, Guid, Volume, VshadowConfig};

fn two_stores() -> common::Built {
    ImageBuilder::new(16)
        .store(StoreSpec::new(1, 200).data(3, 0xd1))
        .store(StoreSpec::new(2, 100).data(2, 0xd2).data(5, 0xd5))
        .build()
}

#[test]
fn lifecycle_errors_are_state_errors() -> Result<()> {
    init_logging();
    let built = two_stores();

    let mut v = Volume::with_config(VshadowConfig::default());
    assert!(!v.is_open());
    assert_eq!(v.close().unwrap_err().kind(), ErrorKind::State);
    assert_eq!(v.number_of_stores().unwrap_err().kind(), ErrorKind::State);
    assert_eq!(v.store(0).unwrap_err().kind(), ErrorKind::State);

    v.open_with_reader(Cursor::new(built.image.clone()))?;
    assert!(v.is_open());
    let again = v.open_with_reader(Cursor::new(built.image.clone()));
    assert_eq!(again.unwrap_err().kind(), ErrorKind::State);
    // the first open is still intact
    assert_eq!(v.number_of_stores()?, 2);

    v.close()?;
    assert!(!v.is_open());
    assert_eq!(v.close().unwrap_err().kind(), ErrorKind::State);

    // reopen after close works
    v.open_with_reader(Cursor::new(built.image.clone()))?;
    assert_eq!(v.number_of_stores()?, 2);
    Ok(())
}

#[test]
fn store_index_range_is_checked() -> Result<()> {
    let v = two_stores().volume();
    assert_eq!(v.number_of_stores()?, 2);
    assert_eq!(v.store(-1).unwrap_err().kind(), ErrorKind::Argument);
    assert_eq!(v.store(2).unwrap_err().kind(), ErrorKind::Argument);
    assert_eq!(v.store(i64::MIN).unwrap_err().kind(), ErrorKind::Argument);
    assert!(v.store(0).is_ok());
    assert!(v.store(1).is_ok());
    Ok(())
}

#[test]
fn stores_follow_catalog_order_and_expose_properties() -> Result<()> {
    let built = two_stores();
    let v = built.volume();

    let s0 = v.store(0)?;
    let s1 = v.store(1)?;
    assert_eq!(s0.identifier(), Guid(guid(1)));
    assert_eq!(s1.identifier(), Guid(guid(2)));
    assert_eq!(s0.creation_time(), 200);
    assert_eq!(s1.creation_time(), 100);

    // chain by creation time: store 1 is older, store 0 is newest
    assert_eq!(s1.next_newer(), Some(0));
    assert_eq!(s0.next_newer(), None);
    assert_eq!(s0.next_older(), Some(1));

    assert_eq!(s0.size(), built.data_size);
    assert_eq!(s0.volume_size(), built.image.len() as u64);
    assert_eq!(v.size()?, built.image.len() as u64);
    assert_eq!(v.block_size(), BS);
    assert_eq!(v.header_version()?, 1);

    assert_eq!(s0.copy_identifier(), Some(Guid(guid(0x41))));
    assert_eq!(s1.copy_set_identifier(), Some(Guid(guid(0x80))));
    assert_eq!(s0.attribute_flags(), 0x0042_000d);
    assert_eq!(s0.operating_machine(), Some("host-1.example"));
    assert_eq!(s1.service_machine(), Some("svc-2.example"));
    assert!(s0.has_in_volume_data());

    assert_eq!(s0.number_of_blocks()?, 1);
    assert_eq!(s1.number_of_blocks()?, 2);
    let b = s1.block(1)?;
    assert_eq!(b.original_offset, 5 * BS);
    assert_eq!(b.offset, built.stores[1].entry_data[1]);
    assert_eq!(s1.block(2).unwrap_err().kind(), ErrorKind::Argument);
    assert_eq!(s1.block(-1).unwrap_err().kind(), ErrorKind::Argument);

    // attribute view and accessors agree
    let info = s1.info()?;
    assert_eq!(info.index, 1);
    assert_eq!(info.identifier, s1.identifier());
    assert_eq!(info.creation_time, s1.creation_time());
    assert_eq!(info.volume_size, s1.size());
    assert_eq!(info.number_of_blocks, s1.number_of_blocks()?);
    assert_eq!(info.operating_machine.as_deref(), s1.operating_machine());
    assert_eq!(info.creation_system_time(), s1.creation_system_time());

    // enumeration and lookup
    let ids: Vec<Guid> = v.stores()?.map(|s| s.identifier()).collect();
    assert_eq!(ids, vec![Guid(guid(1)), Guid(guid(2))]);
    let found = v.store_by_identifier(&Guid(guid(2)))?.expect("store 2");
    assert_eq!(found.index(), 1);
    assert!(v.store_by_identifier(&Guid(guid(9)))?.is_none());
    Ok(())
}

#[test]
fn guid_strings_are_lower_case_canonical() -> Result<()> {
    let v = two_stores().volume();
    let id = v.store(0)?.identifier().to_string();
    assert_eq!(id, "00000001-0000-0000-0000-00000000005a");
    assert_eq!(Guid::parse(&id), Some(v.store(0)?.identifier()));
    Ok(())
}

#[test]
fn in_progress_store_is_listed_without_data() -> Result<()> {
    let built = ImageBuilder::new(8)
        .store(StoreSpec::new(1, 100).data(2, 0xa2))
        .store(StoreSpec::new(2, 200).in_progress())
        .build();
    let v = built.volume();
    assert_eq!(v.number_of_stores()?, 2);
    let s = v.store(1)?;
    assert!(!s.has_in_volume_data());
    assert_eq!(s.number_of_blocks()?, 0);
    assert_eq!(s.copy_identifier(), None);
    assert_eq!(s.operating_machine(), None);
    assert_eq!(s.attribute_flags(), 0);
    assert!(v.store(0)?.has_in_volume_data());
    Ok(())
}

#[test]
fn volume_without_catalog_has_no_stores() -> Result<()> {
    let v = ImageBuilder::new(4).without_catalog().build().volume();
    assert_eq!(v.number_of_stores()?, 0);
    assert_eq!(v.store(0).unwrap_err().kind(), ErrorKind::Argument);
    assert_eq!(v.stores()?.count(), 0);

    let v = ImageBuilder::new(4).build().volume();
    assert_eq!(v.number_of_stores()?, 0);
    Ok(())
}

#[test]
fn chained_catalog_and_v2_header() -> Result<()> {
    let mut b = ImageBuilder::new(8).header_version(2).catalog_slots_per_block(3);
    for i in 0..5u8 {
        b = b.store(StoreSpec::new(i + 1, 100 + u64::from(i)));
    }
    let built = b.build();
    assert!(built.catalog_offsets.len() > 1);
    let v = built.volume();
    assert_eq!(v.header_version()?, 2);
    assert_eq!(v.number_of_stores()?, 5);
    for i in 0..5 {
        let s = v.store(i)?;
        assert_eq!(s.identifier(), Guid(guid(i as u8 + 1)));
        assert!(s.has_in_volume_data());
    }
    Ok(())
}

#[test]
fn open_by_path_and_mode_checks() -> Result<()> {
    init_logging();
    let built = two_stores();
    let mut f = tempfile::NamedTempFile::new()?;
    f.write_all(&built.image)?;
    f.flush()?;

    let mut v = Volume::with_config(VshadowConfig::default());
    let e = v.open_with_mode(f.path(), AccessMode::ReadWrite).unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Argument);
    assert!(!v.is_open());

    v.open(f.path())?;
    assert_eq!(v.number_of_stores()?, 2);
    let data = v.store(1)?.reader().read_at(BS as i64, 2 * BS as i64)?;
    assert!(data.iter().all(|&b| b == 0xd2));

    // a second reader of the same image under a shared lock
    let mut other = Volume::with_config(VshadowConfig::default());
    other.open(f.path())?;
    assert_eq!(other.number_of_stores()?, 2);
    other.close()?;
    v.close()?;

    let missing = f.path().with_extension("missing");
    let e = Volume::with_config(VshadowConfig::default().with_lock_image(false))
        .open(&missing)
        .unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Io);
    Ok(())
}

#[test]
fn builder_applies_config() -> Result<()> {
    let built = two_stores();
    let mut v = Volume::builder()
        .max_chain_blocks(16)
        .zero_fill_unused_blocks(false)
        .lock_image(false)
        .build();
    assert_eq!(v.config().max_chain_blocks, 16);
    assert!(!v.config().zero_fill_unused_blocks);
    v.open_with_reader(Cursor::new(built.image))?;
    assert_eq!(v.number_of_stores()?, 2);
    Ok(())
}

#[test]
fn volume_inside_a_larger_image() -> Result<()> {
    let built = two_stores();
    let lead = 3 * BS as usize + 512;
    let mut disk = vec![0xccu8; lead];
    disk.extend_from_slice(&built.image);
    disk.extend_from_slice(&[0xdd; 4096]);

    let part = BoundedReader::new(Cursor::new(disk), lead as u64, built.image.len() as u64)?;
    let mut v = Volume::with_config(VshadowConfig::default());
    v.open_with_reader(part)?;
    assert_eq!(v.size()?, built.image.len() as u64);
    assert_eq!(v.number_of_stores()?, 2);
    let got = v.store(1)?.reader().read_at(BS as i64, 5 * BS as i64)?;
    assert!(got.iter().all(|&b| b == 0xd5));
    let got = v.store(0)?.reader().read_at(BS as i64, 0)?;
    assert!(got[..] == built.block(0)[..]);
    Ok(())
}
