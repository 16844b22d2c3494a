use super::*;
use crate::codec::h264::sps::parse_sps;
use crate::config::Config;
use crate::error::NalError;
use pretty_assertions::assert_eq;
use quickcheck_macros::quickcheck;

const SEI0_HEX: &str = "0007810f1c0050744080";
const CEA608_HEX: &str = "0434b500314741393403cefffc9420fc94aefc9162fce56efc67bafc91b9\
                          fcb0b0fcbab0fcb0bafcb031fcbab0fcb080fc942cfc942f80";
const AVC_MULTI_HEX: &str = "0001c001061b0509b8000080";
const MISSING_TRAILING_HEX: &str = "01061b0509b80000";
const HEVC_MULTI_HEX: &str = "000a8000000300403dc017a6900105040000be05880660404198b41080";
const HEVC_HDR_HEX: &str = "891800000300000300000300000300000300000300000300000300000300000300000300009004000003000080";
const AVC_PIC_TIMING_HRD_HEX: &str = "010d00000300000300000300021208114de180";

fn hex(s: &str) -> Vec<u8> {
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
        .collect()
}

fn decode_all(rbsp: &[u8], codec: Codec) -> Vec<SeiMessage> {
    let extraction = extract_sei_data(rbsp).unwrap();
    extraction
        .messages
        .iter()
        .map(|sei| decode_sei_message(sei, codec).unwrap())
        .collect()
}

fn hrd_lengths() -> HrdDelayLengths {
    HrdDelayLengths {
        initial_cpb_removal_delay_length_minus1: 26,
        cpb_removal_delay_length_minus1: 30,
        dpb_output_delay_length_minus1: 31,
    }
}

#[test]
fn test_sei_type_names() {
    assert_eq!(SeiType(0).to_string(), "SEIBufferingPeriodType (0)");
    assert_eq!(SeiType(1).to_string(), "SEIPicTimingType (1)");
    assert_eq!(SeiType(4).to_string(), "SEIUserDataRegisteredITUTT35Type (4)");
    assert_eq!(SeiType(136).to_string(), "SEITimeCodeType (136)");
    assert_eq!(SeiType(147).name(), "SEIAlternativeTransferCharacteristicsType");
    assert_eq!(SeiType(200).to_string(), "SEIReservedType (200)");
}

#[test]
fn test_sei_type_constants() {
    let named = [
        (SeiType::BUFFERING_PERIOD, "SEIBufferingPeriodType (0)"),
        (SeiType::PIC_TIMING, "SEIPicTimingType (1)"),
        (SeiType::USER_DATA_REGISTERED_ITU_T_T35, "SEIUserDataRegisteredITUTT35Type (4)"),
        (SeiType::USER_DATA_UNREGISTERED, "SEIUserDataUnregisteredType (5)"),
        (SeiType::RECOVERY_POINT, "SEIRecoveryPointType (6)"),
        (SeiType::TIME_CODE, "SEITimeCodeType (136)"),
        (SeiType::MASTERING_DISPLAY_COLOUR_VOLUME, "SEIMasteringDisplayColourVolumeType (137)"),
        (SeiType::CONTENT_LIGHT_LEVEL_INFORMATION, "SEIContentLightLevelInformationType (144)"),
        (
            SeiType::ALTERNATIVE_TRANSFER_CHARACTERISTICS,
            "SEIAlternativeTransferCharacteristicsType (147)",
        ),
    ];
    for (sei_type, expected) in named {
        assert_eq!(sei_type.to_string(), expected);
    }

    // recovery_point has no typed decoder and stays raw
    let sei = SeiData::new(6, vec![0x84]);
    assert_eq!(sei.sei_type(), SeiType::RECOVERY_POINT);
    let message = decode_sei_message(&sei, Codec::Avc).unwrap();
    assert_eq!(message, SeiMessage::Raw(sei));
    assert_eq!(message.sei_type(), SeiType::RECOVERY_POINT);
}

#[test]
fn test_parse_fixtures_display() {
    let cases: Vec<(&str, Codec, &str, Vec<u32>, Vec<&str>)> = vec![
        (
            "AVC buffering period",
            Codec::Avc,
            SEI0_HEX,
            vec![0],
            vec![r#"SEIBufferingPeriodType (0), size=7, "810f1c00507440""#],
        ),
        (
            "CEA-608",
            Codec::Avc,
            CEA608_HEX,
            vec![4],
            vec![
                r#"SEI type 4 CEA-608, size=52, field1: "942094ae9162e56e67ba91b9b0b0bab0b0bab031bab0b080942c942f", field2: """#,
            ],
        ),
        (
            "AVC multi",
            Codec::Avc,
            AVC_MULTI_HEX,
            vec![0, 1],
            vec![
                r#"SEIBufferingPeriodType (0), size=1, "c0""#,
                "SEIPicTimingType (1), size=6, time=00:00:46:09 offset=0",
            ],
        ),
        (
            "HEVC multi",
            Codec::Hevc,
            HEVC_MULTI_HEX,
            vec![0, 1, 136],
            vec![
                r#"SEIBufferingPeriodType (0), size=10, "80000000403dc017a690""#,
                r#"SEIPicTimingType (1), size=5, "040000be05""#,
                "SEITimeCodeType (136), size=6, time=13:49:12:08 offset=0",
            ],
        ),
        (
            "HEVC HDR",
            Codec::Hevc,
            HEVC_HDR_HEX,
            vec![137, 144],
            vec![
                "SEIMasteringDisplayColourVolumeType (137) 24B: primaries=(0, 0) (0, 0) (0, 0), whitePoint=(0, 0), maxLum=0, minLum=0",
                "SEIContentLightLevelInformationType (144) 4B: maxContentLightLevel=0, maxPicAverageLightLevel=0",
            ],
        ),
    ];

    for (name, codec, rbsp_hex, types, strings) in cases {
        let messages = decode_all(&hex(rbsp_hex), codec);
        let got_types: Vec<u32> = messages.iter().map(|m| m.sei_type().0).collect();
        assert_eq!(got_types, types, "{}", name);
        let got_strings: Vec<String> = messages.iter().map(|m| m.to_string()).collect();
        assert_eq!(got_strings, strings, "{}", name);
    }
}

#[test]
fn test_fixtures_write_back_byte_exact() {
    for (rbsp_hex, codec) in [
        (SEI0_HEX, Codec::Avc),
        (CEA608_HEX, Codec::Avc),
        (AVC_MULTI_HEX, Codec::Avc),
        (HEVC_MULTI_HEX, Codec::Hevc),
        (HEVC_HDR_HEX, Codec::Hevc),
        (AVC_PIC_TIMING_HRD_HEX, Codec::Avc),
    ] {
        let rbsp = hex(rbsp_hex);
        let messages = decode_all(&rbsp, codec);
        assert_eq!(write_sei_messages(&messages).unwrap(), rbsp, "{}", rbsp_hex);
    }
}

#[test]
fn test_hdr_write_from_values() {
    let messages = vec![
        SeiMessage::MasteringDisplayColourVolume(MasteringDisplayColourVolume::default()),
        SeiMessage::ContentLightLevelInformation(ContentLightLevelInformation::default()),
    ];
    assert_eq!(write_sei_messages(&messages).unwrap(), hex(HEVC_HDR_HEX));
}

#[test]
fn test_mastering_display_payload() {
    let payload = hex("11223344556677889900aabbccddeeff0011223344556677");
    let sei = SeiData::new(137, payload.clone());
    let mdcv = MasteringDisplayColourVolume::decode(&sei).unwrap();
    assert_eq!(
        mdcv.display_primaries,
        [(0x1122, 0x3344), (0x5566, 0x7788), (0x9900, 0xaabb)]
    );
    assert_eq!(mdcv.white_point, (0xccdd, 0xeeff));
    assert_eq!(mdcv.max_display_mastering_luminance, 0x0011_2233);
    assert_eq!(mdcv.min_display_mastering_luminance, 0x4455_6677);
    assert_eq!(mdcv.payload().to_vec(), payload);
}

#[test]
fn test_content_light_level_payload() {
    let sei = SeiData::new(144, hex("11223344"));
    let cll = ContentLightLevelInformation::decode(&sei).unwrap();
    assert_eq!(cll.max_content_light_level, 0x1122);
    assert_eq!(cll.max_pic_average_light_level, 0x3344);
    assert_eq!(cll.payload().to_vec(), hex("11223344"));
}

#[test]
fn test_wrong_size_hdr_falls_back_to_raw() {
    let sei = SeiData::new(144, hex("112233"));
    let message = decode_sei_message(&sei, Codec::Hevc).unwrap();
    assert_eq!(message, SeiMessage::Raw(sei.clone()));
    assert_eq!(
        message.to_string(),
        r#"SEIContentLightLevelInformationType (144), size=3, "112233""#
    );
}

#[test]
fn test_alternative_transfer_characteristics() {
    let sei = SeiData::new(147, vec![18u8]);
    let message = decode_sei_message(&sei, Codec::Hevc).unwrap();
    assert_eq!(
        message.to_string(),
        "SEIAlternativeTransferCharacteristicsType (147) 1B: preferredTransferCharacteristics=18"
    );
    assert_eq!(message.payload().unwrap().to_vec(), vec![18u8]);
}

#[test]
fn test_pic_timing_avc_without_hrd() {
    let cases = [
        ("0904078c1080", 0u8, 0u8, false, 7u8, (35u8, 1u8, 1u8)),
        ("1b0509b80000", 1, 1, true, 9, (46, 0, 0)),
        ("2b0509b80000", 2, 1, true, 9, (46, 0, 0)),
    ];
    for (payload_hex, pic_struct, ct_type, cnt_dropped, n_frames, (s, m, h)) in cases {
        let sei = SeiData::new(1, hex(payload_hex));
        let pt = decode_pic_timing_avc(&sei, None, 0).unwrap();
        assert_eq!(pt.delays, None);
        assert_eq!(pt.pic_struct, pic_struct, "{}", payload_hex);
        assert_eq!(pt.clocks.len(), 1);
        let clock = pt.clocks[0].unwrap();
        assert_eq!(clock.ct_type, ct_type);
        assert!(clock.nuit_field_based_flag);
        assert_eq!(clock.counting_type, 0);
        assert!(clock.full_timestamp_flag);
        assert!(!clock.discontinuity_flag);
        assert_eq!(clock.cnt_dropped_flag, cnt_dropped);
        assert_eq!(clock.n_frames, n_frames);
        assert_eq!(
            clock.time,
            ClockTime {
                seconds: Some(s),
                minutes: Some(m),
                hours: Some(h),
            }
        );
        assert_eq!(clock.time_offset, 0);
        assert_eq!(pt.payload().unwrap().to_vec(), hex(payload_hex));
    }
}

#[test]
fn test_pic_timing_avc_with_hrd() {
    let cases = [
        ("00000000000000021208114de1", 0u32, 8u8, (41u8, 47u8, 1u8)),
        ("00000008000000021208313de1", 4, 24, (39, 47, 1)),
        ("0000000c000000021208313de1", 6, 24, (39, 47, 1)),
    ];
    for (payload_hex, cpb, n_frames, (s, m, h)) in cases {
        let sei = SeiData::new(1, hex(payload_hex));
        let pt = decode_pic_timing_avc(&sei, Some(hrd_lengths()), 0).unwrap();
        assert_eq!(
            pt.delays,
            Some(CpbDpbDelay {
                cpb_removal_delay: cpb,
                dpb_output_delay: 1,
            })
        );
        assert_eq!(pt.pic_struct, 0);
        let clock = pt.clocks[0].unwrap();
        assert_eq!(clock.n_frames, n_frames);
        assert_eq!(clock.time.seconds, Some(s));
        assert_eq!(clock.time.minutes, Some(m));
        assert_eq!(clock.time.hours, Some(h));
        assert_eq!(pt.payload().unwrap().to_vec(), hex(payload_hex));
    }
}

#[test]
fn test_pic_timing_with_hrd_extraction() {
    let extraction = extract_sei_data(&hex(AVC_PIC_TIMING_HRD_HEX)).unwrap();
    assert!(!extraction.trailing_bits_missing);
    assert_eq!(extraction.messages.len(), 1);

    let pt = decode_pic_timing_avc(&extraction.messages[0], Some(hrd_lengths()), 0).unwrap();
    assert_eq!(
        pt.to_string(),
        "SEIPicTimingType (1), size=13, time=01:47:41:08 offset=0"
    );
    let rewritten = write_sei_messages(&[SeiMessage::PicTimingAvc(pt)]).unwrap();
    assert_eq!(rewritten, hex(AVC_PIC_TIMING_HRD_HEX));
}

#[test]
fn test_pic_timing_partial_time_and_offset() {
    let mut writer = crate::utils::BitWriter::new();
    writer.write_bits(3, 4).unwrap(); // two clocks
    writer.write_bit(false);
    writer.write_bit(true);
    writer.write_bits(2, 2).unwrap();
    writer.write_bit(false);
    writer.write_bits(4, 5).unwrap();
    writer.write_bit(false); // full_timestamp_flag
    writer.write_bit(true);
    writer.write_bit(false);
    writer.write_bits(12, 8).unwrap();
    writer.write_bit(true);
    writer.write_bits(30, 6).unwrap();
    writer.write_bit(true);
    writer.write_bits(15, 6).unwrap();
    writer.write_bit(false);
    writer.write_bits(0b11101, 5).unwrap(); // -3
    let payload = writer.into_bytes();

    let sei = SeiData::new(1, payload.clone());
    let pt = decode_pic_timing_avc(&sei, None, 5).unwrap();
    assert_eq!(pt.clocks.len(), 2);
    assert_eq!(pt.clocks[0], None);
    let clock = pt.clocks[1].unwrap();
    assert_eq!(clock.ct_type, 2);
    assert_eq!(clock.counting_type, 4);
    assert!(clock.discontinuity_flag);
    assert_eq!(
        clock.time,
        ClockTime {
            seconds: Some(30),
            minutes: Some(15),
            hours: None,
        }
    );
    assert_eq!(clock.time_offset, -3);
    assert_eq!(
        pt.to_string(),
        format!("SEIPicTimingType (1), size={}, time=00:15:30:12 offset=-3", payload.len())
    );
    assert_eq!(pt.payload().unwrap().to_vec(), payload);
}

#[test]
fn test_reserved_pic_struct_has_no_clocks() {
    let sei = SeiData::new(1, vec![0x90u8]);
    let pt = decode_pic_timing_avc(&sei, None, 0).unwrap();
    assert_eq!(pt.pic_struct, 9);
    assert!(pt.clocks.is_empty());
    assert_eq!(pt.payload().unwrap().to_vec(), vec![0x90u8]);
}

#[test]
fn test_truncated_pic_timing_fails() {
    let sei = SeiData::new(1, vec![0x09u8, 0x04]);
    assert!(matches!(
        decode_sei_message(&sei, Codec::Avc),
        Err(NalError::TooFewBits)
    ));
}

#[test]
fn test_hrd_lengths_from_sps() {
    let sps = parse_sps(&hex("674d4028d900780227e59a808080a000000300c0000023c1e30649")).unwrap();
    assert_eq!(HrdDelayLengths::from_sps(&sps), None);
}

#[test]
fn test_time_code() {
    let sei = SeiData::new(136, hex("60404198b410"));
    let tc = decode_time_code(&sei).unwrap();
    assert_eq!(tc.clocks.len(), 1);
    let clock = tc.clocks[0].unwrap();
    assert!(!clock.units_field_based_flag);
    assert!(clock.full_timestamp_flag);
    assert_eq!(clock.n_frames, 8);
    assert_eq!(clock.time.hours, Some(13));
    assert_eq!(clock.time.minutes, Some(49));
    assert_eq!(clock.time.seconds, Some(12));
    assert_eq!(clock.time_offset_length, 0);
    assert_eq!(tc.payload().unwrap().to_vec(), hex("60404198b410"));
}

#[test]
fn test_time_code_is_raw_for_avc() {
    let sei = SeiData::new(136, hex("60404198b410"));
    assert_eq!(
        decode_sei_message(&sei, Codec::Avc).unwrap(),
        SeiMessage::Raw(sei.clone())
    );
}

#[test]
fn test_user_data_registered_without_captions() {
    let sei = SeiData::new(4, hex("b5003c0001"));
    let message = decode_sei_message(&sei, Codec::Avc).unwrap();
    let SeiMessage::UserDataRegistered(ud) = &message else {
        panic!("expected registered user data, got {:?}", message);
    };
    assert_eq!(ud.itu_t_t35_country_code, 0xB5);
    assert_eq!(ud.cea608, None);
    assert_eq!(
        message.to_string(),
        r#"SEIUserDataRegisteredITUTT35Type (4), size=5, "b5003c0001""#
    );
}

#[test]
fn test_user_data_registered_truncated_cc_data() {
    let sei = SeiData::new(4, hex("b5003147413934034eff"));
    let message = decode_sei_message(&sei, Codec::Avc).unwrap();
    let SeiMessage::UserDataRegistered(ud) = &message else {
        panic!("expected registered user data, got {:?}", message);
    };
    assert_eq!(ud.cea608, None);
    assert_eq!(message.payload().unwrap(), sei.payload);
}

#[test]
fn test_user_data_unregistered() {
    let payload = hex("dc45e9bde6d948b7962cd820d923eeef78323634");
    let sei = SeiData::new(5, payload.clone());
    let message = decode_sei_message(&sei, Codec::Avc).unwrap();
    let SeiMessage::UserDataUnregistered(ud) = &message else {
        panic!("expected unregistered user data, got {:?}", message);
    };
    assert_eq!(ud.uuid_iso_iec_11578[0], 0xdc);
    assert_eq!(ud.data.to_vec(), b"x264".to_vec());
    assert_eq!(message.payload().unwrap().to_vec(), payload);

    let short = SeiData::new(5, vec![1u8, 2, 3]);
    assert_eq!(
        decode_sei_message(&short, Codec::Avc).unwrap(),
        SeiMessage::Raw(short.clone())
    );
}

#[test]
fn test_unknown_type_is_raw() {
    let sei = SeiData::new(6, vec![0x84u8]);
    let message = decode_sei_message(&sei, Codec::Avc).unwrap();
    assert_eq!(message, SeiMessage::Raw(sei.clone()));
    assert_eq!(message.to_string(), r#"SEIRecoveryPointType (6), size=1, "84""#);

    let sei = SeiData::new(300, vec![1u8, 2]);
    let rbsp = write_sei_messages(&[decode_sei_message(&sei, Codec::Hevc).unwrap()]).unwrap();
    assert_eq!(rbsp, vec![0xFF, 0x2D, 0x02, 0x01, 0x02, 0x80]);
    assert_eq!(extract_sei_data(&rbsp).unwrap().messages, vec![sei]);
}

#[test]
fn test_missing_trailing_bits() {
    let extraction = extract_sei_data(&hex(MISSING_TRAILING_HEX)).unwrap();
    assert!(extraction.trailing_bits_missing);
    assert_eq!(extraction.messages.len(), 1);
    assert_eq!(
        decode_sei_message(&extraction.messages[0], Codec::Avc)
            .unwrap()
            .to_string(),
        "SEIPicTimingType (1), size=6, time=00:00:46:09 offset=0"
    );

    let (messages, status) = extraction.into_result();
    assert_eq!(messages.len(), 1);
    assert!(matches!(status, Err(NalError::TrailingBitsMissing)));
}

#[test]
fn test_size_past_end_is_error() {
    assert!(matches!(
        extract_sei_data(&hex("0108c080")),
        Err(NalError::TooFewBits)
    ));
    // ff-coded type cut short
    assert!(matches!(
        extract_sei_data(&[0xFF, 0xFF]),
        Err(NalError::TooFewBits)
    ));
}

#[test]
fn test_extraction_limits() {
    let config = Config {
        max_sei_payload_size: 4,
        ..Config::default()
    };
    assert!(matches!(
        extract_sei_data_with(&hex(SEI0_HEX), &config),
        Err(NalError::InvalidData(_))
    ));

    let config = Config {
        max_sei_messages: 2,
        ..Config::default()
    };
    assert!(extract_sei_data_with(&hex(AVC_MULTI_HEX), &config).is_ok());
    assert!(matches!(
        extract_sei_data_with(&hex(HEVC_MULTI_HEX), &config),
        Err(NalError::InvalidData(_))
    ));
}

#[test]
fn test_empty_buffering_period_is_raw() {
    let sei = SeiData::new(0, Vec::<u8>::new());
    assert_eq!(
        decode_sei_message(&sei, Codec::Avc).unwrap(),
        SeiMessage::Raw(sei.clone())
    );
}

#[test]
fn test_sei_nalu_payload() {
    let avc = hex("06000781");
    assert_eq!(sei_nalu_payload(&avc, Codec::Avc).unwrap(), &avc[1..]);
    assert!(matches!(
        sei_nalu_payload(&hex("6588"), Codec::Avc),
        Err(NalError::InvalidData(_))
    ));

    let prefix = hex("4e01890000");
    assert_eq!(sei_nalu_payload(&prefix, Codec::Hevc).unwrap(), &prefix[2..]);
    let suffix = hex("500189");
    assert_eq!(sei_nalu_payload(&suffix, Codec::Hevc).unwrap(), &suffix[2..]);
    assert!(matches!(
        sei_nalu_payload(&hex("4001"), Codec::Hevc),
        Err(NalError::InvalidData(_))
    ));
    assert!(matches!(
        sei_nalu_payload(&[], Codec::Avc),
        Err(NalError::TooFewBits)
    ));
}

#[quickcheck]
fn prop_write_then_extract(messages: Vec<(u16, Vec<u8>)>) -> bool {
    let messages: Vec<SeiData> = messages
        .into_iter()
        .take(32)
        .map(|(t, payload)| SeiData::new(u32::from(t), payload))
        .collect();
    let rbsp = write_sei_data(&messages);
    match extract_sei_data_with(&rbsp, &Config::default()) {
        Ok(extraction) => !extraction.trailing_bits_missing && extraction.messages == messages,
        Err(_) => false,
    }
}
